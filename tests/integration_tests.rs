use expense_tagger::{
    ClassificationPipeline, CliConfig, DateParsing, EtlEngine, FailurePolicy, LocalStorage,
    TaggerError,
};
use expense_tagger::domain::model::ColumnMapping;
use httpmock::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

const INPUT: &str = "Product Name,Unit Price,Quantity,Order Date\n\
Adobe Creative Cloud,54.99,1,2024-03-01\n\
N/A,12.50,2,2024-03-02\n\
Printer Paper,8.00,3,03/05/2024\n";

fn ollama_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "qwen2.5",
        "message": {"role": "assistant", "content": content},
        "done": true
    })
}

fn cli_config(server: &MockServer, temp_dir: &TempDir, policy: FailurePolicy) -> CliConfig {
    let input_path = temp_dir.path().join("expenses.csv");
    std::fs::write(&input_path, INPUT).unwrap();

    CliConfig {
        input_path: input_path.to_str().unwrap().to_string(),
        output_path: temp_dir
            .path()
            .join("out/categorized.csv")
            .to_str()
            .unwrap()
            .to_string(),
        base_url: server.base_url(),
        model: "qwen2.5".to_string(),
        temperature: 0.1,
        seed: Some(42),
        request_timeout_secs: Some(10),
        no_json_format: false,
        prompt_file: None,
        failure_policy: policy,
        date_parsing: DateParsing::Lenient,
        verbose: false,
        json_logs: false,
        monitor: false,
        columns: ColumnMapping::default(),
    }
}

fn read_output(path: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn test_end_to_end_classification_with_mock_ollama() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let adobe_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body_partial(r#"{"model": "qwen2.5", "stream": false, "options": {"seed": 42}}"#)
            .body_contains("Adobe Creative Cloud");
        then.status(200).json_body(ollama_reply(
            "```json\n{\"category\": \"Software & Subscriptions\", \"is_deductible\": true, \"justification\": \"Design software used for client work\"}\n```",
        ));
    });

    let paper_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("Printer Paper");
        then.status(200)
            .json_body(ollama_reply("{\"category\": \"Office Supplies\"}"));
    });

    let config = cli_config(&server, &temp_dir, FailurePolicy::ContinueOnError);
    let output_path = config.output_path.clone();
    let pipeline = ClassificationPipeline::new(LocalStorage::default(), config).unwrap();
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    let result = engine.run().await.unwrap();
    assert_eq!(result, output_path);

    // 缺少品名的列不應呼叫模型
    adobe_mock.assert_hits(1);
    paper_mock.assert_hits(1);

    let rows = read_output(&output_path);
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows[0],
        vec![
            "Product Name",
            "Unit Price",
            "Quantity",
            "Order Date",
            "Category",
            "Is Deductible",
            "Justification"
        ]
    );
    assert_eq!(rows[1][..4], ["Adobe Creative Cloud", "54.99", "1", "2024-03-01"]);
    assert_eq!(
        rows[1][4..],
        ["Software & Subscriptions", "true", "Design software used for client work"]
    );
    assert_eq!(rows[2][4..], ["Unknown", "false", "Missing product information"]);
    assert_eq!(
        rows[3][4..],
        ["Office Supplies", "false", "No justification provided by LLM"]
    );
}

#[tokio::test]
async fn test_unparseable_reply_is_recorded_and_batch_continues() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("Adobe Creative Cloud");
        then.status(200)
            .json_body(ollama_reply("Sorry, I cannot help with that."));
    });

    let paper_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("Printer Paper");
        then.status(200).json_body(ollama_reply(
            "{\"category\": \"Office Supplies\", \"is_deductible\": true, \"justification\": \"Consumables\"}",
        ));
    });

    let config = cli_config(&server, &temp_dir, FailurePolicy::ContinueOnError);
    let output_path = config.output_path.clone();
    let pipeline = ClassificationPipeline::new(LocalStorage::default(), config).unwrap();

    EtlEngine::new(pipeline).run().await.unwrap();
    paper_mock.assert();

    let rows = read_output(&output_path);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][4], "Error");
    assert_eq!(rows[1][5], "false");
    assert!(rows[1][6].starts_with("LLM response parsing error"));
    assert_eq!(rows[3][4..], ["Office Supplies", "true", "Consumables"]);
}

#[tokio::test]
async fn test_server_error_continues_with_processing_error() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("Adobe Creative Cloud");
        then.status(500).json_body(json!({"error": "out of memory"}));
    });

    server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("Printer Paper");
        then.status(200)
            .json_body(ollama_reply("{\"category\": \"Office Supplies\"}"));
    });

    let config = cli_config(&server, &temp_dir, FailurePolicy::ContinueOnError);
    let output_path = config.output_path.clone();
    let pipeline = ClassificationPipeline::new(LocalStorage::default(), config).unwrap();

    EtlEngine::new(pipeline).run().await.unwrap();

    let rows = read_output(&output_path);
    assert_eq!(rows[1][4], "Error");
    assert!(rows[1][6].starts_with("Processing error"));
    assert!(rows[1][6].contains("out of memory"));
    assert_eq!(rows[3][4], "Office Supplies");
}

#[tokio::test]
async fn test_halt_on_error_writes_no_output() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let adobe_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("Adobe Creative Cloud");
        then.status(200)
            .json_body(ollama_reply("{\"category\": \"Software & Subscriptions\"}"));
    });

    let paper_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_contains("Printer Paper");
        then.status(500).body("internal error");
    });

    let config = cli_config(&server, &temp_dir, FailurePolicy::HaltOnError);
    let output_path = config.output_path.clone();
    let pipeline = ClassificationPipeline::new(LocalStorage::default(), config).unwrap();

    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    adobe_mock.assert();
    paper_mock.assert();
    match err {
        TaggerError::BatchHalted { row, .. } => assert_eq!(row, 3),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!Path::new(&output_path).exists());
}

#[tokio::test]
async fn test_bad_prompt_template_fails_before_any_request() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).json_body(ollama_reply("{}"));
    });

    let prompt_path = temp_dir.path().join("prompt.txt");
    std::fs::write(&prompt_path, "Classify {product_name} bought for {price}").unwrap();

    let mut config = cli_config(&server, &temp_dir, FailurePolicy::ContinueOnError);
    config.prompt_file = Some(prompt_path.to_str().unwrap().to_string());
    let output_path = config.output_path.clone();

    let err = match ClassificationPipeline::new(LocalStorage::default(), config) {
        Ok(_) => panic!("template with unknown placeholder should be rejected"),
        Err(e) => e,
    };

    assert!(err.is_configuration());
    api_mock.assert_hits(0);
    assert!(!Path::new(&output_path).exists());
}

#[tokio::test]
async fn test_tab_separated_input_and_output() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).json_body(ollama_reply(
            "{\"category\": \"Meals & Entertainment\", \"is_deductible\": false, \"justification\": \"Personal meal\"}",
        ));
    });

    let input_path = temp_dir.path().join("expenses.tsv");
    std::fs::write(
        &input_path,
        "Product Name\tUnit Price\tQuantity\tOrder Date\nLunch, downtown\t15.00\t1\t2024-04-02\n",
    )
    .unwrap();

    let mut config = cli_config(&server, &temp_dir, FailurePolicy::ContinueOnError);
    config.input_path = input_path.to_str().unwrap().to_string();
    config.output_path = temp_dir.path().join("out.tsv").to_str().unwrap().to_string();
    let output_path = config.output_path.clone();

    let pipeline = ClassificationPipeline::new(LocalStorage::default(), config).unwrap();
    EtlEngine::new(pipeline).run().await.unwrap();

    api_mock.assert_hits(1);
    let content = std::fs::read_to_string(&output_path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Product Name\tUnit Price\tQuantity\tOrder Date\tCategory\tIs Deductible\tJustification"
    );
    assert_eq!(
        lines.next().unwrap(),
        "Lunch, downtown\t15.00\t1\t2024-04-02\tMeals & Entertainment\tfalse\tPersonal meal"
    );
}
