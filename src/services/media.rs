use std::sync::Arc;

use crate::{
    media::{sniff_image, MediaError, MediaHost},
    Result,
};

#[derive(Clone)]
pub struct MediaService {
    host: Option<Arc<dyn MediaHost>>,
}

impl MediaService {
    /// `None` leaves uploads disabled; every attempt then fails.
    pub fn new(host: Option<Arc<dyn MediaHost>>) -> Self {
        Self { host }
    }

    /// Uploads an image and returns its public URL. Non-images are refused
    /// before anything is sent.
    pub async fn upload_image(&self, bytes: &[u8]) -> Result<String> {
        let mime = sniff_image(bytes)?;
        let host = self.host.as_ref().ok_or(MediaError::NotConfigured)?;

        Ok(host.upload(bytes, mime).await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::Error;

    struct EchoHost;

    #[async_trait]
    impl MediaHost for EchoHost {
        async fn upload(&self, bytes: &[u8], mime: &str) -> std::result::Result<String, MediaError> {
            Ok(format!("https://cdn.test/{mime}/{}", bytes.len()))
        }
    }

    const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00";

    #[tokio::test]
    async fn images_are_forwarded_with_their_mime() {
        let media = MediaService::new(Some(Arc::new(EchoHost)));
        assert_eq!(
            media.upload_image(GIF).await.unwrap(),
            "https://cdn.test/image/gif/10"
        );
    }

    #[tokio::test]
    async fn non_images_are_bad_requests() {
        let media = MediaService::new(Some(Arc::new(EchoHost)));

        match media.upload_image(b"").await {
            Err(Error::BadRequest(msg)) => assert_eq!(msg, "No image provided."),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            media.upload_image(b"%PDF-1.7").await,
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn missing_host_is_a_service_error() {
        let media = MediaService::new(None);
        assert!(matches!(
            media.upload_image(GIF).await,
            Err(Error::Service(_))
        ));
    }
}
