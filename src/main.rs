use clap::Parser;
use expense_tagger::utils::{logger, validation::Validate};
use expense_tagger::{ClassificationPipeline, CliConfig, EtlEngine, LocalStorage, TaggerError};

fn report_failure(e: &TaggerError) -> i32 {
    tracing::error!(
        "❌ Expense processing failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    e.severity().exit_code()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init(config.verbose, config.json_logs);

    tracing::info!("==== TAX EXPENSE CATEGORIZER ====");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 建立存儲與管道（提示詞模板在這裡載入，失敗則不處理任何資料列）
    let storage = LocalStorage::default();
    let pipeline = match ClassificationPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => std::process::exit(report_failure(&e)),
    };

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Process completed successfully!");
            println!("✅ Process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => std::process::exit(report_failure(&e)),
    }

    Ok(())
}
