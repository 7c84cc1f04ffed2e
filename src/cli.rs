//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{DEFAULT_IMAGE_MODEL, DEFAULT_OPENAI_BASE_URL};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "ADFORGE_DEBUG")]
    /// Enable debug logging. Env: ADFORGE_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "3001", env = "ADFORGE_PORT")]
    /// http listener, defaults to `3001`.
    /// Env: ADFORGE_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "ADFORGE_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: ADFORGE_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, default_value = "./uploads", env = "ADFORGE_UPLOADS_DIR")]
    /// Where source images are staged while a request runs.
    /// Env: ADFORGE_UPLOADS_DIR
    pub uploads_dir: PathBuf,
    #[clap(long, default_value = "./results", env = "ADFORGE_RESULTS_DIR")]
    /// Where generated images are kept, served under `/results`.
    /// Env: ADFORGE_RESULTS_DIR
    pub results_dir: PathBuf,
    #[clap(long, default_value = "./frontend/dist", env = "ADFORGE_FRONTEND_DIR")]
    /// Built UI assets, served at `/`.
    /// Env: ADFORGE_FRONTEND_DIR
    pub frontend_dir: PathBuf,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// OpenAI API key. Env: OPENAI_API_KEY
    pub openai_api_key: String,
    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "ADFORGE_IMAGE_MODEL")]
    /// Image model. Env: ADFORGE_IMAGE_MODEL
    pub image_model: String,
    #[clap(long, default_value = DEFAULT_OPENAI_BASE_URL, env = "ADFORGE_OPENAI_BASE_URL")]
    /// Base URL of the OpenAI compatible API. Env: ADFORGE_OPENAI_BASE_URL
    pub openai_base_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let cli = CliOptions::try_parse_from(["adforge", "--openai-api-key", "sk-test"])
            .expect("parse");
        assert_eq!(cli.port.get(), 3001);
        assert_eq!(cli.listen_address, "127.0.0.1");
        assert_eq!(cli.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(cli.results_dir, PathBuf::from("./results"));
    }

    #[test]
    fn port_zero_is_refused() {
        assert!(
            CliOptions::try_parse_from(["adforge", "--openai-api-key", "k", "--port", "0"])
                .is_err()
        );
    }
}
