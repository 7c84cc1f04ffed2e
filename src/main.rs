use std::sync::Arc;

use adforge::config::setup_logging;
use adforge::relay::AdRelay;
use adforge::storage::Storage;
use adforge::upstream::OpenAiImageEditor;
use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = adforge::cli::CliOptions::parse();

    let _ = setup_logging(cli.debug);

    let storage = Storage::new(&cli.uploads_dir, &cli.results_dir);
    if let Err(err) = storage.ensure_dirs().await {
        error!("Failed to create storage directories: {}", err);
        return;
    }

    let editor = OpenAiImageEditor::new(cli.openai_api_key)
        .with_model(cli.image_model)
        .with_base_url(cli.openai_base_url);
    let relay = AdRelay::new(Arc::new(editor), storage);

    if let Err(err) = adforge::web::setup_server(
        &cli.listen_address,
        cli.port,
        relay,
        &cli.frontend_dir,
    )
    .await
    {
        error!("Application error: {}", err);
    }
}
