// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use niagads_model::{BedFeature, Track};
use niagads_server::{
    build_router, ApiConfig, AppState, CacheBackend, FilerRouteHelper, MemoryCache, RequestContext,
    ResponseCache,
};
use niagads_store::{FakeMetadataStore, FakeTrackDataSource};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const SPAN: &str = "chr19:1000-2000";

pub fn track(id: &str, build: &str, assay: &str, source: &str) -> Track {
    serde_json::from_value(json!({
        "track_id": id,
        "description": format!("{assay} of {id}"),
        "genome_build": build,
        "biosample_characteristics": {"tissue_category": "Brain", "biosample_term": "astrocyte"},
        "assay": assay,
        "data_source": source,
        "url": format!("https://example.org/{id}.bed.gz"),
    }))
    .expect("track fixture")
}

pub fn features(count: usize, start: i64) -> Vec<BedFeature> {
    (0..count)
        .map(|i| {
            let offset = start + (i as i64) * 10;
            serde_json::from_value(json!({
                "chrom": "chr19",
                "chromStart": offset,
                "chromEnd": offset + 5,
                "name": format!("peak{i}"),
                "score": i,
            }))
            .expect("feature fixture")
        })
        .collect()
}

/// NGEN000611 (3 hits, ChIP-seq), NGEN000612 (5 hits, DNase-seq),
/// NGEN000613 (no hits, ChIP-seq) on GRCh38, and NGEN000100 on GRCh37.
pub fn metadata_store() -> FakeMetadataStore {
    FakeMetadataStore::new(vec![
        track("NGEN000611", "GRCh38", "ChIP-seq", "ENCODE"),
        track("NGEN000612", "GRCh38", "DNase-seq", "ENCODE"),
        track("NGEN000613", "GRCh38", "ChIP-seq", "GTEx"),
        track("NGEN000100", "GRCh37", "ChIP-seq", "ENCODE"),
    ])
    .with_collection("ADSP-FunGen", "functional genomics", &["NGEN000611", "NGEN000613"])
}

pub fn remote() -> FakeTrackDataSource {
    FakeTrackDataSource::new()
        .with_track("NGEN000611", features(3, 1100))
        .with_track("NGEN000612", features(5, 1500))
        .with_track("NGEN000613", features(2, 50_000))
}

pub struct Harness {
    pub helper: Arc<FilerRouteHelper>,
    pub metadata: FakeMetadataStore,
    pub remote: FakeTrackDataSource,
    pub backend: Arc<MemoryCache>,
}

pub fn config(page_size: u64, tracks_per_request: usize) -> ApiConfig {
    ApiConfig {
        page_size,
        tracks_per_request,
        cache_timeout: Duration::from_millis(200),
        ..ApiConfig::default()
    }
}

pub fn helper_with_backend(
    metadata: FakeMetadataStore,
    remote: FakeTrackDataSource,
    backend: Arc<dyn CacheBackend>,
    config: &ApiConfig,
) -> FilerRouteHelper {
    let cache = ResponseCache::new(backend, config.cache_timeout, config.cache_ttl);
    FilerRouteHelper::new(Arc::new(metadata), Arc::new(remote), cache, config)
}

pub fn harness(page_size: u64, tracks_per_request: usize) -> Harness {
    let metadata = metadata_store();
    let remote = remote();
    let backend = Arc::new(MemoryCache::new(256));
    let helper = helper_with_backend(
        metadata.clone(),
        remote.clone(),
        backend.clone(),
        &config(page_size, tracks_per_request),
    );
    Harness {
        helper: Arc::new(helper),
        metadata,
        remote,
        backend,
    }
}

pub fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn context(request_id: &str, path: &str, pairs: &[(&str, &str)]) -> RequestContext {
    RequestContext::new(request_id, path, query(pairs))
}

pub async fn spawn_server(helper: FilerRouteHelper, config: ApiConfig) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(AppState::new(helper, config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

pub async fn send_raw_with_headers(
    addr: SocketAddr,
    path: &str,
    headers: &[(&str, &str)],
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let extra: String = headers
        .iter()
        .map(|(k, v)| format!("{k}: {v}\r\n"))
        .collect();
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n{extra}Connection: close\r\n\r\n");
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    (status, head.to_string(), body.to_string())
}

pub async fn send_raw(addr: SocketAddr, path: &str) -> (u16, String, String) {
    send_raw_with_headers(addr, path, &[]).await
}

pub fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim()
            .eq_ignore_ascii_case(name)
            .then(|| v.trim().to_string())
    })
}
