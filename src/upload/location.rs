// ABOUTME: Storage URL construction and its inverse.
// ABOUTME: Virtual-hosted URLs out, canonical s3://bucket/key paths back.

use url::Url;

use super::error::UploadError;

/// Region whose endpoint omits the region segment.
const GLOBAL_ENDPOINT_REGION: &str = "us-east-1";

const AMAZONAWS: &str = ".amazonaws.com";

/// Virtual-hosted style URL for `key` in `bucket`.
pub fn build_url(bucket: &str, region: &str, key: &str) -> String {
    if region.is_empty() || region == GLOBAL_ENDPOINT_REGION {
        format!("https://{bucket}.s3.amazonaws.com/{key}")
    } else {
        format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
    }
}

/// Map a storage URL (virtual-hosted, path-style or already canonical) to
/// `s3://bucket/key`.
pub fn url_to_canonical_path(raw: &str) -> Result<String, UploadError> {
    let invalid = |reason: &str| UploadError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
    let path = parsed.path().trim_start_matches('/');

    let (bucket, key) = match parsed.scheme() {
        "s3" => (host, path),
        "http" | "https" => {
            let endpoint = host
                .strip_suffix(AMAZONAWS)
                .ok_or_else(|| invalid("not an amazonaws.com host"))?;
            if is_regional_endpoint(endpoint) {
                path.split_once('/')
                    .ok_or_else(|| invalid("path-style URL without a key"))?
            } else {
                let at = [host.rfind(".s3."), host.rfind(".s3-")]
                    .into_iter()
                    .flatten()
                    .max()
                    .ok_or_else(|| invalid("not an S3 endpoint"))?;
                (&host[..at], path)
            }
        }
        other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
    };

    if bucket.is_empty() {
        return Err(invalid("empty bucket"));
    }
    if key.is_empty() {
        return Err(invalid("empty key"));
    }
    Ok(format!("s3://{bucket}/{key}"))
}

/// `s3`, `s3.<region>` or `s3-<region>`, i.e. a path-style host.
fn is_regional_endpoint(endpoint: &str) -> bool {
    endpoint == "s3"
        || ((endpoint.starts_with("s3.") || endpoint.starts_with("s3-"))
            && !endpoint.contains(".s3"))
}
