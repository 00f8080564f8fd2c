use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn, Level};

use localparam::core::logging::init_tracing;
use localparam::local::{ChannelParameterSink, LoggingListener};
use localparam::{
    LocalParameterManagerBuilder, ManagerConfig, MemberPath, MissionDatabase, NamedObjectId,
    ParameterProvider, ParameterValue, SoftwareParameterManager, Value,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(Level::DEBUG);

    let base = concat!(env!("CARGO_MANIFEST_DIR"), "/");
    let config = ManagerConfig::from_yaml_file(format!("{}config.yaml", base))?;
    let mdb = MissionDatabase::from_yaml_file(format!("{}mdb.yaml", base))?;

    let (sink, mut recorded) = ChannelParameterSink::new();
    let recorder = tokio::spawn(async move {
        let mut batches = 0usize;
        while let Some(batch) = recorded.recv().await {
            batches += 1;
            let json = serde_json::to_string(&batch).unwrap_or_default();
            info!(batch = batches, "Recorded {}", json);
        }
        batches
    });

    let manager = LocalParameterManagerBuilder::new()
        .config(config)
        .database(mdb)
        .recording_sink(Arc::new(sink))
        .listener(Arc::new(LoggingListener))
        .build()?;

    let setpoint = manager
        .resolve(&NamedObjectId::namespaced("MDB:OPS", "HEATER_SP"))
        .context("heater setpoint should be a local parameter")?;
    let mode = manager.resolve(&NamedObjectId::qualified("/demo/mode"))?;
    let pointing = manager.resolve(&NamedObjectId::qualified("/demo/pointing"))?;

    // Strings are coerced to the declared types
    let report = manager.update_batch(vec![
        ParameterValue::new(setpoint.clone(), Value::String("21.5".into())),
        ParameterValue::new(mode.clone(), Value::String("NOMINAL".into())),
        ParameterValue::new(
            pointing.clone(),
            Value::from_json(&serde_json::json!({
                "ra": 10.68,
                "dec": 41.27,
                "offsets": [0, 0, 0]
            }))
            .context("pointing literal")?,
        ),
    ])?;
    info!(submitted = report.submitted, "First batch submitted");
    manager.sync().await?;

    // Partial updates need the full value above to be cached first
    let offset: MemberPath = "offsets[1]".parse()?;
    let report = manager.update_batch(vec![
        ParameterValue::partial(pointing.clone(), offset, Value::SInt64(-4)),
        ParameterValue::new(mode.clone(), Value::String("WARP".into())),
    ])?;
    for rejected in &report.rejected {
        warn!(parameter = %rejected.parameter, "Rejected: {}", rejected.error);
    }

    manager.assign(&mode, Value::SInt64(2))?;

    let battery = localparam::ParameterDefinition::new(
        "/demo/battery_voltage",
        localparam::DataSource::Telemetered,
    );
    if let Err(e) = manager.assign(&battery, Value::Double(28.0)) {
        warn!("{}", e);
    }

    manager.stop().await;
    drop(manager);
    let batches = recorder.await?;
    info!(batches, "Demo finished");
    Ok(())
}
