use std::sync::{Arc, Mutex};

use adforge::relay::AdRelay;
use adforge::storage::Storage;
use adforge::upstream::{EditError, EditRequest, ImageEditor};
use adforge::wizard::{AdClient, SelectedFile, Step, Wizard};
use async_trait::async_trait;
use url::Url;

/// Answers every edit with `count` copies of a tiny payload, or with a fixed failure.
struct FakeEditor {
    fail_with: Option<(u16, &'static str)>,
    counts: Mutex<Vec<u8>>,
}

#[async_trait]
impl ImageEditor for FakeEditor {
    async fn edit(&self, request: EditRequest) -> Result<Vec<String>, EditError> {
        self.counts.lock().expect("lock").push(request.count);
        if let Some((status, message)) = self.fail_with {
            return Err(EditError::Api {
                status,
                message: Some(message.to_string()),
            });
        }
        Ok((0..request.count).map(|_| "aGVsbG8=".to_string()).collect())
    }
}

struct Running {
    dir: tempfile::TempDir,
    client: AdClient,
    editor: Arc<FakeEditor>,
}

async fn start_relay(fail_with: Option<(u16, &'static str)>) -> Running {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new(dir.path().join("uploads"), dir.path().join("results"));
    storage.ensure_dirs().await.expect("create dirs");
    let frontend = dir.path().join("dist");
    std::fs::create_dir_all(&frontend).expect("create dist");
    std::fs::write(frontend.join("index.html"), "<html></html>").expect("write index");

    let editor = Arc::new(FakeEditor {
        fail_with,
        counts: Mutex::new(Vec::new()),
    });
    let app = adforge::web::app(AdRelay::new(editor.clone(), storage), &frontend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = AdClient::new(Url::parse(&format!("http://{addr}")).expect("url")).expect("client");
    Running {
        dir,
        client,
        editor,
    }
}

fn wizard_ready_to_submit(ads: &str) -> Wizard {
    let mut wizard = Wizard::new();
    wizard.set_product_name("Widget").expect("name");
    wizard.next().expect("to uploads");
    wizard
        .add_images(vec![SelectedFile::new(
            "widget.png",
            "image/png",
            &b"\x89PNG\r\n\x1a\nwidget"[..],
        )])
        .expect("add image");
    wizard.next().expect("to guidance");
    wizard.set_guidance_prompt("on a table").expect("guidance");
    wizard.set_ad_count_text(ads).expect("count");
    wizard
}

#[tokio::test]
async fn wizard_round_trip_through_relay() {
    let running = start_relay(None).await;
    let mut wizard = wizard_ready_to_submit("2");

    let submission = wizard.begin_submission().expect("begin");
    let outcome = running.client.generate(&submission).await;
    assert_eq!(wizard.finish_submission(outcome), Ok(Step::Results));
    assert_eq!(wizard.generated_images().len(), 2);
    assert_eq!(*running.editor.counts.lock().expect("lock"), vec![2]);

    // each URL is served by the relay
    for url in wizard.generated_images() {
        let absolute = running.client.resolve(url).expect("resolve");
        let body = reqwest::get(absolute)
            .await
            .expect("fetch result")
            .bytes()
            .await
            .expect("result body");
        assert_eq!(&body[..], b"hello");
    }

    let results = std::fs::read_dir(running.dir.path().join("results"))
        .expect("read results")
        .count();
    assert_eq!(results, 2);
    let uploads = std::fs::read_dir(running.dir.path().join("uploads"))
        .expect("read uploads")
        .count();
    assert_eq!(uploads, 0);
}

#[tokio::test]
async fn ad_count_is_clamped_end_to_end() {
    let running = start_relay(None).await;
    let mut wizard = wizard_ready_to_submit("40");

    let submission = wizard.begin_submission().expect("begin");
    assert_eq!(submission.ad_count, 5);
    let outcome = running.client.generate(&submission).await;
    wizard.finish_submission(outcome).expect("finish");
    assert_eq!(*running.editor.counts.lock().expect("lock"), vec![5]);
    assert_eq!(wizard.generated_images().len(), 5);
}

#[tokio::test]
async fn upstream_failure_lands_in_banner() {
    let running = start_relay(Some((429, "rate limited"))).await;
    let mut wizard = wizard_ready_to_submit("1");

    let submission = wizard.begin_submission().expect("begin");
    let outcome = running.client.generate(&submission).await;
    assert_eq!(wizard.finish_submission(outcome), Ok(Step::Guidance));
    assert_eq!(wizard.error(), Some("rate limited"));
    assert!(wizard.generated_images().is_empty());
}
