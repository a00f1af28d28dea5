//! AWS Signature Version 4 for content-store requests
//!
//! Storage access keys never leave the process: each request gets
//! `x-amz-date`, `x-amz-content-sha256` and an `Authorization` header
//! carrying an HMAC-SHA256 signature over the method, path, query and
//! every header present at signing time.

use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

use crate::transport::HttpRequest;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Characters left bare in canonical URIs and query strings
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Access key pair and region used to sign storage requests
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKeys {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

impl SigningKeys {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
        }
    }

    /// Add the signing headers to `request` as of `now`.
    pub fn sign(
        &self,
        request: HttpRequest,
        now: DateTime<Utc>,
    ) -> Result<HttpRequest, InvalidLength> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let day = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(&request.body));

        let request = request
            .header("x-amz-date", amz_date.as_str())
            .header("x-amz-content-sha256", payload_hash.as_str());

        let (canonical_headers, signed_headers) = canonical_headers(&request);
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method,
            canonical_uri(&request),
            canonical_query(&request),
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let scope = format!("{}/{}/{}/aws4_request", day, self.region, SERVICE);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = hex::encode(self.signing_key(&day)?.finalize_with(&string_to_sign)?);
        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.access_key, scope, signed_headers, signature
        );
        Ok(request.header("Authorization", authorization))
    }

    fn signing_key(&self, day: &str) -> Result<SigningKey, InvalidLength> {
        let secret = format!("AWS4{}", self.secret_key);
        let key = hmac_sha256(secret.as_bytes(), day.as_bytes())?;
        let key = hmac_sha256(&key, self.region.as_bytes())?;
        let key = hmac_sha256(&key, SERVICE.as_bytes())?;
        Ok(SigningKey(hmac_sha256(&key, b"aws4_request")?))
    }
}

impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeys")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}

struct SigningKey(Vec<u8>);

impl SigningKey {
    fn finalize_with(&self, message: &str) -> Result<Vec<u8>, InvalidLength> {
        hmac_sha256(&self.0, message.as_bytes())
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Path with each segment encoded once, unreserved characters bare
fn canonical_uri(request: &HttpRequest) -> String {
    let encoded: Vec<String> = request
        .url
        .path()
        .split('/')
        .map(|segment| {
            let raw = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&raw, UNRESERVED).to_string()
        })
        .collect();
    let path = encoded.join("/");
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

fn canonical_query(request: &HttpRequest) -> String {
    let mut pairs: Vec<(String, String)> = request
        .url
        .query_pairs()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, UNRESERVED).to_string(),
                utf8_percent_encode(&v, UNRESERVED).to_string(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// `(canonical header block, signed header list)`, including `host`
fn canonical_headers(request: &HttpRequest) -> (String, String) {
    let mut host = request.url.host_str().unwrap_or_default().to_string();
    if let Some(port) = request.url.port() {
        host = format!("{}:{}", host, port);
    }

    let mut headers: Vec<(String, String)> = vec![("host".to_string(), host)];
    for (name, value) in &request.headers {
        let name = name.to_ascii_lowercase();
        if name == "authorization" || name == "host" {
            continue;
        }
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        headers.push((name, value));
    }
    headers.sort();

    let block: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    let signed = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (block, signed)
}
