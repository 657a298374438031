//! Wait command - poll a live cluster until resources are ready

use std::time::Duration;

use console::style;
use keel_kube::{
    CancellationToken, KubeAccessor, ObjectSelector, ReadinessTarget, ResourceKind, WaitConfig,
    WaitCoordinator,
};

use crate::error::{CliError, Result};

pub async fn run(
    namespace: &str,
    kind: &str,
    selector: Option<&str>,
    name: Option<&str>,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let kind: ResourceKind = kind.parse()?;
    let selector = match (selector, name) {
        (_, Some(name)) => ObjectSelector::Name(name.to_string()),
        (Some(labels), None) => ObjectSelector::parse_labels(labels)?,
        (None, None) => {
            return Err(CliError::input_with_help(
                "nothing to wait for",
                "pass --selector key=value or --name NAME",
            ));
        }
    };
    let target = ReadinessTarget {
        kind,
        namespace: namespace.to_string(),
        selector,
    };

    let config = WaitConfig { interval, timeout };
    config.validate()?;
    let accessor = KubeAccessor::try_default().await?;
    let coordinator = WaitCoordinator::new(accessor, config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling wait");
            on_interrupt.cancel();
        }
    });

    println!(
        "{} Waiting for {} (timeout {:?})",
        style("→").blue(),
        style(&target).cyan(),
        timeout
    );

    let outcome = coordinator.wait_for_ready(std::slice::from_ref(&target), &cancel).await;
    if outcome.is_ready() {
        println!("{} {}", style("✓").green(), outcome.summary());
        return Ok(());
    }

    for not_ready in outcome.not_ready() {
        println!("  {} {}", style("✗").red(), not_ready);
    }
    outcome.into_result()?;
    Ok(())
}
