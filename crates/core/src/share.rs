//! Patient profile sharing via link and QR code.
//!
//! Each generation draws a fresh token; nothing revokes earlier ones and `expires_at` is
//! advisory.

use crate::config::CoreConfig;
use crate::constants::{QR_ID_LEN, SHARE_TOKEN_LEN, SHARE_TOKEN_TTL_DAYS};
use crate::validation::validate_patient_id_safe_for_url;
use crate::{PortalError, PortalResult};
use api_shared::{QrCodeData, ShareProfileRes};
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Where the generator seed came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntropySource {
    /// Operating system secure random source.
    Secure,
    /// System clock. Not suitable for secrets.
    Fallback,
}

/// Seeds a generator from `fill`, falling back to the clock if it fails.
fn seeded_rng<F>(fill: F) -> (StdRng, EntropySource)
where
    F: FnOnce(&mut [u8; 32]) -> Result<(), rand::Error>,
{
    let mut seed = [0u8; 32];
    match fill(&mut seed) {
        Ok(()) => (StdRng::from_seed(seed), EntropySource::Secure),
        Err(e) => {
            tracing::warn!(
                "secure random source unavailable ({}); share tokens fall back to a clock seed",
                e
            );
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            (StdRng::seed_from_u64(nanos), EntropySource::Fallback)
        }
    }
}

fn alphanumeric(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Builds share links and QR codes for patient profiles.
#[derive(Clone, Debug)]
pub struct ShareService {
    share_base_url: String,
    qr_image_url: String,
}

impl ShareService {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            share_base_url: cfg.share_base_url().to_string(),
            qr_image_url: cfg.qr_image_url().to_string(),
        }
    }

    /// Generates a fresh QR id and token for `patient_id`.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidInput` if the patient id is empty or not URL-safe.
    pub fn generate_unique_qr_data(&self, patient_id: &str) -> PortalResult<QrCodeData> {
        self.generate_with(patient_id, |seed| OsRng.try_fill_bytes(seed))
            .map(|(data, _)| data)
    }

    fn generate_with<F>(
        &self,
        patient_id: &str,
        fill: F,
    ) -> PortalResult<(QrCodeData, EntropySource)>
    where
        F: FnOnce(&mut [u8; 32]) -> Result<(), rand::Error>,
    {
        validate_patient_id_safe_for_url(patient_id)?;

        let (mut rng, source) = seeded_rng(fill);
        let token = alphanumeric(&mut rng, SHARE_TOKEN_LEN);
        let qr_id = format!("qr_{}", alphanumeric(&mut rng, QR_ID_LEN));
        let created_at = Utc::now();

        Ok((
            QrCodeData {
                qr_id,
                patient_id: patient_id.to_string(),
                token,
                created_at,
                expires_at: created_at + Duration::days(SHARE_TOKEN_TTL_DAYS),
            },
            source,
        ))
    }

    /// `{base}/{patientId}?qr={qrId}&token={token}`
    pub fn shareable_link(&self, data: &QrCodeData) -> String {
        format!(
            "{}/{}?qr={}&token={}",
            self.share_base_url, data.patient_id, data.qr_id, data.token
        )
    }

    /// URL of a PNG rendering of `link` from the configured third-party QR service.
    pub fn qr_image_url(&self, link: &str) -> PortalResult<String> {
        let url = reqwest::Url::parse_with_params(
            &self.qr_image_url,
            &[
                ("size", "400x400"),
                ("data", link),
                ("margin", "10"),
                ("format", "png"),
            ],
        )
        .map_err(|e| PortalError::InvalidInput(format!("invalid qr image url: {e}")))?;
        Ok(url.to_string())
    }

    /// Renders `link` as an SVG QR code locally.
    pub fn render_svg(&self, link: &str) -> PortalResult<String> {
        use qrcode::render::svg;
        use qrcode::QrCode;

        let code = QrCode::new(link.as_bytes()).map_err(PortalError::QrRender)?;
        Ok(code
            .render::<svg::Color>()
            .min_dimensions(200, 200)
            .max_dimensions(400, 400)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .quiet_zone(true)
            .build())
    }

    /// Generates new share data with its link and image URL.
    pub fn regenerate(&self, patient_id: &str) -> PortalResult<ShareProfileRes> {
        let qr_data = self.generate_unique_qr_data(patient_id)?;
        let share_link = self.shareable_link(&qr_data);
        let qr_url = self.qr_image_url(&share_link)?;
        tracing::info!("share link regenerated for patient {}", patient_id);

        Ok(ShareProfileRes {
            qr_data,
            qr_url,
            share_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn service() -> ShareService {
        ShareService::new(&CoreConfig::default())
    }

    #[test]
    fn test_tokens_are_distinct_across_generations() {
        let service = service();
        let mut seen = HashSet::new();
        let mut previous: Option<String> = None;
        for _ in 0..1000 {
            let data = service.generate_unique_qr_data("patient_1").unwrap();
            assert_ne!(previous.as_ref(), Some(&data.token));
            assert!(seen.insert(data.token.clone()), "token repeated");
            previous = Some(data.token);
        }
    }

    #[test]
    fn test_qr_data_shape() {
        let data = service().generate_unique_qr_data("patient_1").unwrap();
        assert_eq!(data.token.len(), 32);
        assert!(data.token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(data.qr_id.starts_with("qr_"));
        assert_eq!(data.qr_id.len(), 3 + 16);
        assert_eq!(data.expires_at - data.created_at, Duration::days(7));
        assert!(!data.is_expired(data.created_at));
        assert!(data.is_expired(data.created_at + Duration::days(8)));
    }

    #[test]
    fn test_rejects_empty_patient_id() {
        assert!(matches!(
            service().generate_unique_qr_data("  "),
            Err(PortalError::InvalidInput(_))
        ));
        assert!(service().generate_unique_qr_data("a/b").is_err());
    }

    #[test]
    fn test_share_link_and_qr_url_format() {
        let service = service();
        let res = service.regenerate("patient_1").unwrap();
        let expected_link = format!(
            "https://medicalrecords.app/profile/patient_1?qr={}&token={}",
            res.qr_data.qr_id, res.qr_data.token
        );
        assert_eq!(res.share_link, expected_link);

        let qr = reqwest::Url::parse(&res.qr_url).unwrap();
        assert_eq!(qr.host_str(), Some("api.qrserver.com"));
        assert_eq!(qr.path(), "/v1/create-qr-code/");
        let params: Vec<(String, String)> = qr.query_pairs().into_owned().collect();
        assert_eq!(
            params,
            vec![
                ("size".to_string(), "400x400".to_string()),
                ("data".to_string(), expected_link),
                ("margin".to_string(), "10".to_string()),
                ("format".to_string(), "png".to_string()),
            ]
        );
    }

    #[test]
    fn test_fallback_seed_is_reported() {
        let (data, source) = service()
            .generate_with("patient_1", |_| {
                Err(rand::Error::new(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no entropy",
                )))
            })
            .unwrap();
        assert_eq!(source, EntropySource::Fallback);
        assert_eq!(data.token.len(), 32);

        let (_, source) = service()
            .generate_with("patient_1", |seed| OsRng.try_fill_bytes(seed))
            .unwrap();
        assert_eq!(source, EntropySource::Secure);
    }

    #[test]
    fn test_render_svg() {
        let svg = service()
            .render_svg("https://medicalrecords.app/profile/p?qr=qr_x&token=t")
            .unwrap();
        assert!(svg.contains("<svg"));
    }
}
