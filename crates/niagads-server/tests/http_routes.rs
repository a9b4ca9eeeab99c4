// SPDX-License-Identifier: Apache-2.0

mod filer_support;

use filer_support::{
    config, header_value, helper_with_backend, metadata_store, remote, send_raw,
    send_raw_with_headers,
};
use niagads_server::MemoryCache;
use niagads_store::FakeTrackDataSource;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

const DATA: &str = "/filer/data?track=NGEN000611,NGEN000612&span=chr19:1000-2000";

async fn start_with(source: FakeTrackDataSource) -> SocketAddr {
    let cfg = config(4, 50);
    let helper = helper_with_backend(
        metadata_store(),
        source,
        Arc::new(MemoryCache::new(128)),
        &cfg,
    );
    filer_support::spawn_server(helper, cfg).await
}

async fn start() -> SocketAddr {
    start_with(remote()).await
}

fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

#[tokio::test]
async fn health_and_version_respond() {
    let addr = start().await;
    let (status, _, body) = send_raw(addr, "/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");

    let (status, _, body) = send_raw(addr, "/version").await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["name"], "niagads-server");
}

#[tokio::test]
async fn track_data_echoes_the_propagated_request_id() {
    let addr = start().await;
    let (status, head, body) =
        send_raw_with_headers(addr, DATA, &[("x-request-id", "trace-abc")]).await;
    assert_eq!(status, 200);
    assert_eq!(header_value(&head, "x-request-id").as_deref(), Some("trace-abc"));

    let payload = json(&body);
    assert_eq!(payload["request"]["request_id"], "trace-abc");
    assert_eq!(payload["request"]["endpoint"], "/filer/data");
    assert_eq!(payload["pagination"]["total_num_pages"], 2);
    assert_eq!(payload["data"].as_array().map(Vec::len), Some(4));
    assert_eq!(payload["data"][0]["track_id"], "NGEN000612");
}

#[tokio::test]
async fn generated_request_ids_are_returned_when_none_is_sent() {
    let addr = start().await;
    let (status, head, body) = send_raw(addr, DATA).await;
    assert_eq!(status, 200);
    let generated = header_value(&head, "x-request-id").expect("request id header");
    assert!(generated.starts_with("req-"));
    assert_eq!(json(&body)["request"]["request_id"], generated.as_str());
}

#[tokio::test]
async fn identical_query_revalidates_with_etag() {
    let addr = start().await;
    let (status, head, _) = send_raw_with_headers(addr, DATA, &[("x-request-id", "first")]).await;
    assert_eq!(status, 200);
    let etag = header_value(&head, "etag").expect("etag");

    let (status, head, body) = send_raw_with_headers(
        addr,
        DATA,
        &[("x-request-id", "second"), ("if-none-match", etag.as_str())],
    )
    .await;
    assert_eq!(status, 304);
    assert!(body.is_empty());
    assert_eq!(header_value(&head, "etag").as_deref(), Some(etag.as_str()));
}

#[tokio::test]
async fn text_counts_render_one_row_per_track() {
    let addr = start().await;
    let (status, head, body) = send_raw(
        addr,
        "/filer/data?track=NGEN000611,NGEN000612,NGEN000613&span=chr19:1000-2000&content=counts&format=text",
    )
    .await;
    assert_eq!(status, 200);
    assert!(header_value(&head, "content-type")
        .unwrap_or_default()
        .starts_with("text/plain"));
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines, vec!["#track_id\tnum_overlaps", "NGEN000612\t5", "NGEN000611\t3", "NGEN000613\t0"]);
}

#[tokio::test]
async fn bed_features_omit_the_header_line() {
    let addr = start().await;
    let (status, _, body) = send_raw(
        addr,
        "/filer/data?track=NGEN000611&span=chr19:1000-2000&format=bed",
    )
    .await;
    assert_eq!(status, 200);
    assert!(!body.starts_with('#'));
    assert_eq!(body.lines().count(), 3);
    assert!(body.lines().all(|l| l.starts_with("chr19\t")));
}

#[tokio::test]
async fn request_errors_map_to_status_codes() {
    let addr = start().await;

    let (status, _, body) = send_raw(addr, &format!("{DATA}&page=abc")).await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidParameter");

    let (status, _, body) = send_raw(addr, &format!("{DATA}&page=9")).await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidPage");

    let (status, _, body) =
        send_raw(addr, "/filer/data?track=BOGUS&span=chr19:1000-2000").await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidTrackId");

    let (status, _, body) = send_raw(
        addr,
        "/filer/data?track=NGEN000611,NGEN000100&span=chr19:1000-2000",
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(json(&body)["error"]["code"], "MultipleAssemblies");

    let (status, _, body) = send_raw(addr, "/filer/data?track=NGEN000611").await;
    assert_eq!(status, 400);
    assert!(json(&body)["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("span"));
}

#[tokio::test]
async fn remote_outage_is_a_bad_gateway() {
    let source = remote();
    let addr = start_with(source.clone()).await;
    source.set_failing(true);
    let (status, _, body) =
        send_raw_with_headers(addr, DATA, &[("x-request-id", "trace-down")]).await;
    assert_eq!(status, 502);
    let payload = json(&body);
    assert_eq!(payload["error"]["code"], "RemoteSource");
    assert_eq!(payload["error"]["request_id"], "trace-down");
}

#[tokio::test]
async fn search_route_lists_informative_tracks() {
    let addr = start().await;
    let (status, _, body) = send_raw(
        addr,
        "/filer/data/search?span=chr19:1000-2000&filter=assay%20eq%20ChIP-seq&content=ids",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["data"], serde_json::json!(["NGEN000611"]));
}

#[tokio::test]
async fn track_metadata_routes() {
    let addr = start().await;
    let (status, _, body) = send_raw(addr, "/filer/track/NGEN000612").await;
    assert_eq!(status, 200);
    let payload = json(&body);
    assert_eq!(payload["data"][0]["track_id"], "NGEN000612");
    assert_eq!(payload["pagination"]["total_num_pages"], 1);

    let (status, _, body) = send_raw(addr, "/filer/track?track=NGEN000611,NGEN000613&content=ids").await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["data"], serde_json::json!(["NGEN000611", "NGEN000613"]));
}

#[tokio::test]
async fn metadata_counts_are_json_only() {
    let addr = start().await;
    let (status, _, body) = send_raw(
        addr,
        "/filer/metadata/search?filter=assay%20eq%20ChIP-seq&content=counts",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["data"]["num_tracks"], 2);

    let (status, _, body) = send_raw(
        addr,
        "/filer/metadata/search?filter=assay%20eq%20ChIP-seq&content=counts&format=text",
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidParameter");
}

#[tokio::test]
async fn collection_routes() {
    let addr = start().await;
    let (status, _, body) = send_raw(addr, "/filer/collection").await;
    assert_eq!(status, 200);
    let payload = json(&body);
    assert_eq!(payload["data"][0]["name"], "ADSP-FunGen");
    assert_eq!(payload["data"][0]["num_tracks"], 2);

    let (status, _, body) = send_raw(addr, "/filer/collection/ADSP-FunGen?content=ids").await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["data"], serde_json::json!(["NGEN000611", "NGEN000613"]));

    let (status, _, body) = send_raw(addr, "/filer/collection/unknown").await;
    assert_eq!(status, 404);
    assert_eq!(json(&body)["error"]["code"], "NotFound");
}

#[tokio::test]
async fn filter_summary_route_lists_field_values() {
    let addr = start().await;
    let (status, _, body) = send_raw(addr, "/filer/metadata/filter/assay?counts=true").await;
    assert_eq!(status, 200);
    let values = json(&body)["data"].clone();
    let chip = values
        .as_array()
        .and_then(|rows| rows.iter().find(|r| r["value"] == "ChIP-seq"))
        .cloned()
        .expect("ChIP-seq row");
    assert_eq!(chip["num_tracks"], 3);

    let (status, _, _) = send_raw(addr, "/filer/metadata/filter/nonsense").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn qtl_route_resolves_variants_and_refuses_genes() {
    let addr = start().await;
    let (status, _, body) = send_raw(addr, "/filer/qtl/NGEN000612?loc=19:1512:A:G").await;
    assert_eq!(status, 200);
    let payload = json(&body);
    assert_eq!(payload["request"]["endpoint"], "/filer/qtl/NGEN000612");
    assert_eq!(payload["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(payload["data"][0]["track_id"], "NGEN000612");

    let (status, _, body) = send_raw(
        addr,
        "/filer/qtl/NGEN000612?loc=chr19:1000-2000&content=counts&format=text",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body.lines().collect::<Vec<_>>(), vec!["#track_id\tnum_overlaps", "NGEN000612\t5"]);

    let (status, _, body) = send_raw(addr, "/filer/qtl/NGEN000612?loc=APOE").await;
    assert_eq!(status, 501);
    assert_eq!(json(&body)["error"]["code"], "NotImplemented");

    let (status, _, body) = send_raw(addr, "/filer/qtl/NGEN000612").await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidParameter");
}
