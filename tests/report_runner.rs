use std::sync::{Arc, Mutex};

use tempfile::tempdir;

use tabreport::config::{Language, ReportConfig};
use tabreport::contract::MockViewRenderer;
use tabreport::report::{ensure_portfolio_dirs, generate_reports};
use tabreport::roster::Client;

fn acme() -> Client {
    Client {
        cmr_number: "123".to_string(),
        portfolio_short_en: "JUS".to_string(),
        portfolio_short_fr: "JUS".to_string(),
        client_name_short_en: "Acme".to_string(),
        client_name_short_fr: "Acmé".to_string(),
    }
}

fn client(cmr: &str, name: &str) -> Client {
    Client {
        cmr_number: cmr.to_string(),
        portfolio_short_en: "JUS".to_string(),
        portfolio_short_fr: "JUS".to_string(),
        client_name_short_en: name.to_string(),
        client_name_short_fr: name.to_string(),
    }
}

#[tokio::test]
async fn writes_one_page_file_per_view_client_pair() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    let views = config.views_for(Language::En, &[1]);
    let clients = vec![acme()];

    let mut renderer = MockViewRenderer::new();
    renderer
        .expect_render_pdf()
        .withf(|view_id, filters| {
            view_id == "4e8a17eb-0d30-4161-bcf7-46d3044cc88b"
                && filters.contains(&("Client1B".to_string(), "123".to_string()))
                && filters
                    .iter()
                    .any(|(k, v)| k == "Cut-Off Date1" && v == "2024-03-31")
        })
        .times(1)
        .returning(|_, _| Ok(b"%PDF page one".to_vec()));

    let report = generate_reports(
        &renderer,
        &config,
        &views,
        &clients,
        Language::En,
        "2024-03-31",
        out.path(),
    )
    .await;

    assert_eq!(report.succeeded.len(), 1);
    assert!(report.failed.is_empty());

    let page = out.path().join("EN/JUS/Acme/PAGE_1.pdf");
    assert_eq!(std::fs::read(&page).unwrap(), b"%PDF page one");
}

#[tokio::test]
async fn leading_zeros_are_stripped_from_the_client_filter() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    let views = config.views_for(Language::En, &[1]);
    let clients = vec![client("0123", "Padded")];

    let mut renderer = MockViewRenderer::new();
    renderer
        .expect_render_pdf()
        .withf(|_, filters| filters.contains(&("Client1B".to_string(), "123".to_string())))
        .times(1)
        .returning(|_, _| Ok(b"%PDF".to_vec()));

    let report = generate_reports(
        &renderer,
        &config,
        &views,
        &clients,
        Language::En,
        "2024-03-31",
        out.path(),
    )
    .await;

    assert_eq!(report.succeeded.len(), 1);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn iterates_views_outer_clients_inner() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    let views = config.views_for(Language::En, &[1, 2]);
    let clients = vec![client("111", "First"), client("222", "Second")];

    let calls: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);

    let mut renderer = MockViewRenderer::new();
    renderer.expect_render_pdf().times(4).returning(move |view_id, filters| {
        let cmr = filters
            .iter()
            .find(|(k, _)| k.starts_with("Client"))
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        seen.lock().unwrap().push((view_id.to_string(), cmr));
        Ok(b"%PDF".to_vec())
    });

    generate_reports(
        &renderer,
        &config,
        &views,
        &clients,
        Language::En,
        "2024-03-31",
        out.path(),
    )
    .await;

    let calls = calls.lock().unwrap();
    let page1 = &views[0].view_id;
    let page2 = &views[1].view_id;
    // Each view is requested once per client before the next view starts.
    assert_eq!(
        *calls,
        vec![
            (page1.clone(), "111".to_string()),
            (page1.clone(), "222".to_string()),
            (page2.clone(), "111".to_string()),
            (page2.clone(), "222".to_string()),
        ]
    );
}

#[tokio::test]
async fn one_failing_client_does_not_stop_the_rest() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    let views = config.views_for(Language::En, &[1]);
    let clients = vec![
        client("111", "First"),
        client("222", "Second"),
        client("333", "Third"),
    ];

    let mut renderer = MockViewRenderer::new();
    renderer.expect_render_pdf().times(3).returning(|_, filters| {
        if filters.contains(&("Client1B".to_string(), "222".to_string())) {
            Err("render blew up".into())
        } else {
            Ok(b"%PDF".to_vec())
        }
    });

    let report = generate_reports(
        &renderer,
        &config,
        &views,
        &clients,
        Language::En,
        "2024-03-31",
        out.path(),
    )
    .await;

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].reason.contains("render blew up"));

    assert!(out.path().join("EN/JUS/First/PAGE_1.pdf").exists());
    assert!(!out.path().join("EN/JUS/Second/PAGE_1.pdf").exists());
    assert!(out.path().join("EN/JUS/Third/PAGE_1.pdf").exists());
}

#[test]
fn ensure_portfolio_dirs_creates_output_and_merged_skeletons() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();

    ensure_portfolio_dirs(&config, out.path());
    // Idempotent: creating an existing tree is not an error.
    ensure_portfolio_dirs(&config, out.path());

    assert!(out.path().join("EN/JUS").is_dir());
    assert!(out.path().join("FR/PDADR").is_dir());
    assert!(out.path().join("merged/EN/JUS").is_dir());
    assert!(out.path().join("merged/FR/SDF").is_dir());
}
