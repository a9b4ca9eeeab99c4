// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 5000;
/// Upper bound on track ids sent to the remote source in one call.
pub const TRACKS_PER_API_REQUEST_LIMIT: usize = 50;
pub const CACHE_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const CACHE_TTL: Duration = Duration::from_secs(3600);
pub const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
/// Track counts at or below this are fetched as full feature lists and counted locally.
pub const MAX_TRACKS_FOR_FEATURE_COUNTING: usize = 3;
pub const DEFAULT_METADATA_SESSIONS: usize = 16;
