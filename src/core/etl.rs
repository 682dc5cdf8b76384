use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// 讀取 → 分類 → 寫出；任何階段失敗都不會寫出部分結果
    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting expense processing...");
        self.monitor.log_stats("Start");

        let raw_data = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        let outcome = self.pipeline.transform(raw_data).await?;
        self.monitor.log_stats("Classify");
        tracing::info!(
            "Processed {} rows ({} skipped, {} failed)",
            outcome.summary.total(),
            outcome.summary.skipped,
            outcome.summary.failed
        );

        let output_path = self.pipeline.load(outcome).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        tracing::info!("✓ Processing complete. Results saved to {}", output_path);
        Ok(output_path)
    }
}
