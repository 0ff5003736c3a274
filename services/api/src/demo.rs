use std::sync::Arc;

use clap::Args;
use talentflow::client::{JobListParams, JobsClient, TransportError};
use talentflow::error::AppError;
use talentflow::pipeline::sim::Simulation;
use talentflow::pipeline::Pipeline;
use talentflow::store::{Store, MIGRATIONS};

use crate::seed::{seed, SeedProfile};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of jobs to seed for the walkthrough
    #[arg(long, default_value_t = 8)]
    pub(crate) jobs: usize,
    /// Number of candidates to seed for the walkthrough
    #[arg(long, default_value_t = 12)]
    pub(crate) candidates: usize,
}

fn transport(err: TransportError) -> AppError {
    AppError::Io(std::io::Error::other(err))
}

/// Scripted walkthrough: seed a store, read through the caching client,
/// reorder optimistically, then force a write failure to show the rollback.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(Store::open(MIGRATIONS)?);
    let summary = seed(
        &store,
        SeedProfile {
            jobs: args.jobs,
            candidates: args.candidates,
        },
    )
    .await?;
    println!(
        "TalentFlow demo: seeded {} jobs, {} candidates, {} assessments",
        summary.jobs, summary.candidates, summary.assessments
    );

    let healthy = Pipeline::new(store.clone(), Simulation::off());
    let client = JobsClient::new(healthy.router());
    let params = JobListParams {
        page: Some(1),
        page_size: Some(10),
        ..JobListParams::default()
    };

    let view = client.list(&params).await.map_err(transport)?;
    println!("\nActive jobs, page 1 of {}:", view.total_pages);
    for job in &view.items {
        println!("  #{:>2}  {}  [{}]", job.order, job.title, job.status.label());
    }

    if let Some(last) = view.items.last() {
        println!("\nMoving {:?} to the top of the board...", last.title);
        client.reorder(&view, last.id, 0).await.map_err(transport)?;
        let after = client.list(&params).await.map_err(transport)?;
        let mut ranked: Vec<_> = after.items.iter().collect();
        ranked.sort_by_key(|job| job.order);
        println!("New top of board: {:?}", ranked[0].title);
    }

    // The same store behind a pipeline whose writes always fail, to show
    // the optimistic rollback.
    let failing = Pipeline::new(store, Simulation::off().with_write_fail_rate(1.0));
    let failing_client = JobsClient::new(failing.router());
    let before = failing_client.list(&params).await.map_err(transport)?;
    if let Some(first) = before.items.first() {
        println!("\nForcing a write failure while moving {:?}...", first.title);
        match failing_client
            .reorder(&before, first.id, before.items.len().saturating_sub(1))
            .await
        {
            Ok(()) => println!("unexpected: the write went through"),
            Err(err) => println!("write rejected ({err}); cached view rolled back"),
        }
        let restored = failing_client.list(&params).await.map_err(transport)?;
        println!(
            "View after rollback matches the original: {}",
            *restored == *before
        );
    }

    Ok(())
}
