use std::process;

use clap::Parser;
use collegium::{
    application::{
        catalog::CatalogService,
        error::{AppError, ErrorReport},
        search::{CutoffCriteria, InstitutionCriteria},
    },
    config::{
        self, CliArgs, Command, CutoffCommand, CutoffSearchArgs, InstitutionCommand,
        InstitutionSearchArgs, RecordCommand,
    },
    domain::{entities::Record, types::RecordState},
    infra::{bootstrap, error::InfraError, telemetry},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("collegium", error);
    let log = || {
        error!(
            kind = report.kind.as_str(),
            chain = ?report.messages,
            "command failed"
        );
    };

    if dispatcher::has_been_set() {
        log();
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, log);
}

async fn run() -> Result<(), AppError> {
    let cli = CliArgs::parse();
    let settings = config::load(&cli).map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;

    if let Command::Migrate = cli.command {
        return Ok(bootstrap::migrate(&settings.store).await?);
    }

    let catalog = bootstrap::Catalog::from_settings(&settings).await?;

    match cli.command {
        Command::Institutions { command } => match command {
            InstitutionCommand::Record(command) => run_record(&catalog.institutions, command).await,
            InstitutionCommand::Search(args) => {
                let (criteria, page, limit) = institution_criteria(args)?;
                emit(&catalog.institutions.search(&criteria, page, limit).await?)
            }
        },
        Command::Cutoffs { command } => match command {
            CutoffCommand::Record(command) => run_record(&catalog.cutoffs, command).await,
            CutoffCommand::Search(args) => {
                let (criteria, page, limit) = cutoff_criteria(args);
                emit(&catalog.cutoffs.search(&criteria, page, limit).await?)
            }
            CutoffCommand::ByInstitute { code } => {
                emit(&catalog.cutoffs.by_institute_code(&code).await?)
            }
        },
        Command::Version { kind } => emit(&catalog.feed.version(kind.into()).await?),
        Command::Updates(args) => emit(
            &catalog
                .feed
                .updates(args.kind.into(), args.from_version, args.to_version)
                .await?,
        ),
        Command::Migrate => Ok(()),
    }
}

async fn run_record<R: Record>(
    service: &CatalogService<R>,
    command: RecordCommand,
) -> Result<(), AppError> {
    match command {
        RecordCommand::Get { id } => emit(&service.get_by_id(&id).await?),
        RecordCommand::List(args) => emit(&service.list(args.page, args.limit, args.cursor).await?),
        RecordCommand::Create { payload } => emit(&service.create(parse_json(&payload)?).await?),
        RecordCommand::Update { id, patch } => {
            emit(&service.update(&id, parse_json(&patch)?).await?)
        }
        RecordCommand::Delete { id } => emit(&service.delete(&id).await?),
    }
}

fn institution_criteria(
    args: InstitutionSearchArgs,
) -> Result<(InstitutionCriteria, Option<u32>, Option<u32>), AppError> {
    let status = args
        .status
        .map(|state| {
            serde_json::from_value::<RecordState>(Value::String(state.trim().to_lowercase()))
                .map_err(|_| {
                    AppError::validation(format!(
                        "unknown status `{state}` (expected active|inactive|archived)"
                    ))
                })
        })
        .transpose()?;

    let criteria = InstitutionCriteria {
        year: args.year,
        institute_code: args.institute_code,
        category: args.category,
        branch_name: args.branch_name,
        city: args.city,
        status,
        institute_name: args.institute_name,
    };
    Ok((criteria, args.page, args.limit))
}

fn cutoff_criteria(args: CutoffSearchArgs) -> (CutoffCriteria, Option<u32>, Option<u32>) {
    let criteria = CutoffCriteria {
        college_id: args.college_id,
        institute_code: args.institute_code,
        year: args.year,
        round: args.round,
        category: args.category,
        branch_name: args.branch_name,
    };
    (criteria, args.page, args.limit)
}

fn parse_json(raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw).map_err(|err| AppError::validation(format!("invalid JSON: {err}")))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| InfraError::Io(std::io::Error::from(err)))?;
    println!("{rendered}");
    Ok(())
}
