//! Common test utilities and helpers.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image_normalizer::{
    config::{
        AuthConfig, Config, LoggingConfig, NormalizationConfig, RateLimitConfig, ServerConfig,
    },
    create_router,
    jpeg::markers::{find_pair, DHT, EOI, SOS},
    jpeg::MarkerSegments,
    AppState,
};
use std::net::TcpListener;
use std::time::Duration;
use tokio::net::TcpListener as TokioTcpListener;

/// Test server instance
pub struct TestServer {
    pub base_url: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a test server on a random port
    pub async fn start() -> Self {
        Self::start_with_config(create_test_config(false, vec![], false)).await
    }

    /// Start a test server with authentication enabled
    pub async fn start_with_auth(api_keys: Vec<String>) -> Self {
        Self::start_with_config(create_test_config(true, api_keys, false)).await
    }

    /// Start a test server with a tiny rate limit
    pub async fn start_with_rate_limit() -> Self {
        Self::start_with_config(create_test_config(false, vec![], true)).await
    }

    async fn start_with_config(mut config: Config) -> Self {
        let port = get_available_port();
        config.server.port = port;
        let base_url = format!("http://127.0.0.1:{}", port);

        let app = create_router(AppState::new(config));

        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        let listener = TokioTcpListener::bind(addr)
            .await
            .expect("Failed to bind listener");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            tokio::select! {
                _ = axum::serve(listener, app) => {}
                _ = shutdown_rx => {}
            }
        });

        // Give the server time to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get HTTP client
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Create test configuration
pub fn create_test_config(auth_enabled: bool, api_keys: Vec<String>, rate_limited: bool) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_request_size: 16 * 1024 * 1024,
        },
        normalization: NormalizationConfig::default(),
        rate_limit: RateLimitConfig {
            enabled: rate_limited,
            requests_per_window: if rate_limited { 2 } else { 1000 },
            window_seconds: 60,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
        auth: AuthConfig {
            enabled: auth_enabled,
            api_keys,
            protected_paths: vec!["/api/normalize".to_string()],
            public_paths: vec!["/health".to_string()],
        },
    }
}

/// Find an available TCP port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to random port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// Create a test PNG image
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    use image::codecs::png::PngEncoder;
    use image::{ImageBuffer, ImageEncoder, Rgb};

    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width) as u8,
            ((y * 255) / height) as u8,
            128,
        ])
    });

    let mut buffer = Vec::new();
    let encoder = PngEncoder::new(&mut buffer);
    encoder
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .expect("Failed to encode PNG");

    buffer
}

/// Create a test JPEG image
pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    use image::codecs::jpeg::JpegEncoder;
    use image::{ImageBuffer, ImageEncoder, Rgb};

    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width) as u8,
            ((y * 255) / height) as u8,
            200,
        ])
    });

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .expect("Failed to encode JPEG");

    buffer
}

/// Create a JPEG whose Huffman tables are optimized for its own content
pub fn create_optimized_jpeg(width: u16, height: u16) -> Vec<u8> {
    use jpeg_encoder::{ColorType, Encoder};

    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height as u32 {
        for x in 0..width as u32 {
            pixels.extend_from_slice(&[
                ((x * 7) ^ (y * 13)) as u8,
                ((x * y) >> 3) as u8,
                (x + 2 * y) as u8,
            ]);
        }
    }

    let mut buffer = Vec::new();
    let mut encoder = Encoder::new(&mut buffer, 85);
    encoder.set_optimized_huffman_tables(true);
    encoder
        .encode(&pixels, width, height, ColorType::Rgb)
        .expect("Failed to encode optimized JPEG");

    buffer
}

/// Decoded RGB pixels of a JPEG stream
pub fn decode_rgb(jpeg: &[u8]) -> Vec<u8> {
    image::load_from_memory(jpeg)
        .expect("Failed to decode JPEG")
        .to_rgb8()
        .into_raw()
}

/// `data:<mime>;base64,<data>`
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Decode the payload of a data URL produced by the server
pub fn decode_data_url(url: &str) -> Vec<u8> {
    let (_, encoded) = url.split_once(',').expect("data URL without comma");
    STANDARD.decode(encoded).expect("invalid base64 in data URL")
}

/// Copy of `jpeg` with every DHT segment removed
pub fn strip_huffman_tables(jpeg: &[u8]) -> Vec<u8> {
    let mut out = jpeg[..2].to_vec();
    for segment in MarkerSegments::from_offset(jpeg, 2) {
        match segment.marker {
            DHT => continue,
            SOS => {
                out.extend_from_slice(&jpeg[segment.offset..]);
                return out;
            }
            _ => out.extend_from_slice(&jpeg[segment.span()]),
        }
    }
    out
}

/// Assert the container properties every valid output must have
pub fn assert_container_structure(jpeg: &[u8]) {
    assert!(jpeg.starts_with(&[0xFF, 0xD8]), "missing SOI");
    assert!(jpeg.ends_with(&[0xFF, EOI]), "missing EOI");
    assert!(
        MarkerSegments::new(jpeg).any(|s| s.marker == DHT && s.intact),
        "missing DHT"
    );
    let sos = MarkerSegments::new(jpeg)
        .find(|s| s.marker == SOS && s.intact)
        .expect("missing SOS");
    assert!(
        find_pair(jpeg, 0xFF, 0x00, sos.body.end).is_some(),
        "missing FF 00 after SOS"
    );
}
