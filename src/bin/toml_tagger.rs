use anyhow::Context;
use clap::Parser;
use expense_tagger::config::toml_config::TomlConfig;
use expense_tagger::core::prompt::{PromptBuilder, PromptTemplate};
use expense_tagger::core::{table, ConfigProvider};
use expense_tagger::utils::{logger, validation::Validate};
use expense_tagger::{ClassificationPipeline, EtlEngine, FailurePolicy, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-tagger")]
#[command(about = "Expense categorizer driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "expense-tagger.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override failure policy from config
    #[arg(long, value_enum)]
    failure_policy: Option<FailurePolicy>,

    /// Dry run - render the first prompt without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init(args.verbose, args.json_logs);

    tracing::info!("🚀 Starting TOML-based expense tagger");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(policy) = args.failure_policy {
        config.processing.failure_policy = policy;
        tracing::info!("🔧 Failure policy overridden to: {:?}", policy);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No inference calls will be made");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = match ClassificationPipeline::new(LocalStorage::default(), config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Process completed successfully!");
            println!("✅ Process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Expense processing failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Model: {} @ {}", config.model(), config.base_url());
    println!("  Temperature: {}", config.temperature());
    if let Some(seed) = config.seed() {
        println!("  Seed: {}", seed);
    }
    println!("  Input: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!(
        "  Prompt: {}",
        config.prompt_file().unwrap_or("(built-in template)")
    );
    println!("  Failure policy: {:?}", config.failure_policy());
    println!("  Date parsing: {:?}", config.date_parsing());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let template = PromptTemplate::load(config.prompt_file()).context("loading prompt template")?;
    let prompts = PromptBuilder::new(template, config.date_parsing());

    let input_path = config.input_path();
    let bytes = std::fs::read(input_path)
        .with_context(|| format!("reading input file {}", input_path))?;
    let dataset = table::read_table(&bytes, table::delimiter_for(input_path))
        .with_context(|| format!("parsing input file {}", input_path))?;

    println!("📂 Input Analysis:");
    println!("  Rows: {}", dataset.len());
    println!("  Columns: {}", dataset.headers.join(", "));

    let columns = config.columns();
    for name in [
        &columns.product_name,
        &columns.unit_price,
        &columns.quantity,
        &columns.order_date,
    ] {
        if dataset.column_index(name).is_none() {
            println!("  ⚠️ Column '{}' not found; its default value will be used", name);
        }
    }

    if dataset.is_empty() {
        println!();
        println!("✅ Dry run complete. Input has no rows; output would contain only headers.");
        return Ok(());
    }

    let record = table::record_at(&dataset, 0, columns).context("reading row 1")?;
    println!();
    if record.is_missing_product() {
        println!("⏭️ Row 1 has no product name and would be skipped without a model call.");
    } else {
        let prompt = prompts.build(&record).context("rendering prompt for row 1")?;
        println!("📝 Prompt for row 1:");
        println!("{}", prompt);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
