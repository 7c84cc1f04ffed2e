use std::io::{self, Write};
use std::path::Path;

use adforge::config::setup_logging;
use adforge::rules::{MAX_ADS, MAX_IMAGES, MIN_ADS};
use adforge::wizard::{AdClient, SelectedFile, Step, Wizard};
use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

/// Walk through the ad wizard in the terminal.
///
/// Minimal UX:
///   ad_wizard --server http://localhost:3001
#[derive(Parser, Debug)]
#[command(name = "ad_wizard")]
#[command(about = "Generate product ad images through an adforge relay")]
struct Args {
    /// Base URL of the relay
    #[arg(long, default_value = "http://localhost:3001", env = "ADFORGE_SERVER")]
    server: Url,

    /// Enable debug logging
    #[arg(long, env = "ADFORGE_DEBUG")]
    debug: bool,
}

/// Prints a prompt and reads one trimmed line, `None` on end of input.
fn ask(question: &str) -> Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "{question}")?;
    stdout.flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn show_header(wizard: &Wizard) {
    let step = wizard.step();
    println!();
    println!("Step {}: {}", step.number(), step.title());
    if let Some(error) = wizard.error() {
        println!("  ! {error}");
    }
}

fn show_images(wizard: &Wizard) {
    if wizard.images().is_empty() {
        println!("  (no images yet)");
    }
    for (index, image) in wizard.images().iter().enumerate() {
        let file = image.file();
        println!(
            "  {}. {} ({:.2} MB) {}",
            index + 1,
            file.name(),
            file.size() as f64 / 1024.0 / 1024.0,
            image.preview()
        );
    }
}

/// Runs one step's interaction. Returns false when input ends.
async fn run_step(wizard: &mut Wizard, client: &AdClient) -> Result<bool> {
    show_header(wizard);
    match wizard.step() {
        Step::ProductInfo => {
            let Some(name) = ask("Product name: ")? else {
                return Ok(false);
            };
            wizard.set_product_name(name)?;
            if let Err(err) = wizard.next() {
                println!("  {err}");
            }
        }
        Step::UploadImages => {
            show_images(wizard);
            let Some(line) = ask(&format!(
                "Image paths (up to {MAX_IMAGES}, JPG/PNG/WEBP, max 5MB each), `rm N`, `back` or `next`: "
            ))?
            else {
                return Ok(false);
            };
            match line.as_str() {
                "back" => {
                    wizard.back()?;
                }
                "next" => {
                    if let Err(err) = wizard.next() {
                        println!("  {err}");
                    }
                }
                _ => {
                    if let Some(index) = line.strip_prefix("rm ") {
                        match index.trim().parse::<usize>() {
                            Ok(number) if number > 0 => {
                                if let Err(err) = wizard.remove_image(number - 1) {
                                    println!("  {err}");
                                }
                            }
                            _ => println!("  Usage: rm <number>"),
                        }
                    } else {
                        add_paths(wizard, &line)?;
                    }
                }
            }
        }
        Step::Guidance => {
            let Some(guidance) = ask("Guidance prompt (`back` to go back): ")? else {
                return Ok(false);
            };
            if guidance == "back" {
                wizard.back()?;
                return Ok(true);
            }
            wizard.set_guidance_prompt(guidance)?;
            let Some(count) = ask(&format!("Number of ads to generate ({MIN_ADS}-{MAX_ADS}): "))?
            else {
                return Ok(false);
            };
            wizard.set_ad_count_text(&count)?;

            let submission = match wizard.begin_submission() {
                Ok(submission) => submission,
                Err(err) => {
                    println!("  {err}");
                    return Ok(true);
                }
            };
            println!("Generating {} ad(s)...", submission.ad_count);
            let outcome = client.generate(&submission).await;
            wizard.finish_submission(outcome)?;
        }
        Step::Results => {
            for url in wizard.generated_images() {
                match client.resolve(url) {
                    Ok(absolute) => println!("  {absolute}"),
                    Err(_) => println!("  {url}"),
                }
            }
            let Some(answer) = ask("Start over? [y/N] ")? else {
                return Ok(false);
            };
            if !matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes") {
                return Ok(false);
            }
            wizard.start_over()?;
        }
    }
    Ok(true)
}

/// Loads every path on the line as one selection.
fn add_paths(wizard: &mut Wizard, line: &str) -> Result<()> {
    let mut files = Vec::new();
    for path in line.split_whitespace() {
        match SelectedFile::from_path(Path::new(path)) {
            Ok(file) => files.push(file),
            Err(err) => {
                println!("  Could not read {path}: {err}");
                return Ok(());
            }
        }
    }
    if files.is_empty() {
        return Ok(());
    }
    // rejections are shown through the banner on the next header
    let _ = wizard.add_images(files);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _ = setup_logging(args.debug);

    let client = AdClient::new(args.server.clone())
        .with_context(|| format!("Invalid server URL {}", args.server))?;
    let mut wizard = Wizard::new();

    println!("Generate Your Ad Images");
    while run_step(&mut wizard, &client).await? {}
    Ok(())
}
