use std::{collections::BTreeMap, path::Path, process, sync::Arc};

use published_cache::{
    application::error::AppError,
    cache::{CacheConfig, InMemoryDistributedCache},
    config::{self, Command, GetArgs, HasArgs, SeedArgs},
    infra::{
        archive::{self, InstalledArchive},
        bootstrap::{CacheCollaborators, CacheContext},
        memory::InMemoryBackend,
        telemetry,
    },
    published::{PublishedContent, PublishedMember, PublishedModel},
};
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;
    let cache_config = CacheConfig::from(&settings.cache);

    match cli_args.command {
        Command::Seed(args) => run_seed(&cache_config, args).await,
        Command::Get(args) => run_get(&cache_config, args).await,
        Command::Has(args) => run_has(&cache_config, args).await,
    }
}

struct Loaded {
    context: CacheContext,
    installed: InstalledArchive,
}

fn load(cache_config: &CacheConfig, path: &Path) -> Result<Loaded, AppError> {
    let archive = archive::load_archive(path)?;
    let backend = InMemoryBackend::new();
    let installed = archive.install(&backend)?;
    let collaborators =
        CacheCollaborators::in_memory(&backend, Arc::new(InMemoryDistributedCache::new()));

    Ok(Loaded {
        context: CacheContext::build(cache_config, collaborators),
        installed,
    })
}

async fn run_seed(cache_config: &CacheConfig, args: SeedArgs) -> Result<(), AppError> {
    let Loaded { context, .. } = load(cache_config, &args.archive)?;
    let filter = (!args.content_types.is_empty()).then_some(args.content_types.as_slice());

    let content = context.content.seed(filter).await?;
    let media = context.media.seed(filter).await?;
    info!(content, media, "Seed complete");

    print_json(&serde_json::json!({ "content": content, "media": media }))
}

async fn run_get(cache_config: &CacheConfig, args: GetArgs) -> Result<(), AppError> {
    let Loaded { context, installed } = load(cache_config, &args.archive)?;
    let reference = args
        .key
        .map(|key| key.to_string())
        .or_else(|| args.id.map(|id| id.to_string()))
        .unwrap_or_default();

    if args.member {
        let member = match (args.id, args.key) {
            (Some(id), _) => installed.member_by_id(id),
            (None, Some(key)) => installed.member_by_key(key),
            (None, None) => None,
        }
        .ok_or_else(|| AppError::not_found("member", &reference))?;
        let member = context.factory.to_published_member(member)?;
        return print_json(&MemberView::from(&member));
    }

    let (kind, model) = match (args.media, args.id, args.key) {
        (true, Some(id), _) => ("media", context.media.get_by_id(id).await?),
        (true, None, Some(key)) => ("media", context.media.get_by_key(key).await?),
        (false, Some(id), _) => ("content", context.content.get_by_id(id, args.preview).await?),
        (false, None, Some(key)) => (
            "content",
            context.content.get_by_key(key, args.preview).await?,
        ),
        (media, None, None) => (if media { "media" } else { "content" }, None),
    };
    let model = model.ok_or_else(|| AppError::not_found(kind, &reference))?;
    print_json(&ModelView::from(&model))
}

async fn run_has(cache_config: &CacheConfig, args: HasArgs) -> Result<(), AppError> {
    let Loaded { context, .. } = load(cache_config, &args.archive)?;
    context.content.seed(None).await?;

    let cached = context.content.has_content_by_id(args.id, args.preview).await?;
    print_json(&serde_json::json!({
        "id": args.id,
        "preview": args.preview,
        "cached": cached,
    }))
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let encoded = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{encoded}");
    Ok(())
}

#[derive(Serialize)]
struct ModelView {
    model: Option<String>,
    #[serde(flatten)]
    content: Option<ContentView>,
}

impl From<&PublishedModel> for ModelView {
    fn from(model: &PublishedModel) -> Self {
        Self {
            model: model.model_name().map(str::to_string),
            content: model.content().map(ContentView::from),
        }
    }
}

#[derive(Serialize)]
struct ContentView {
    id: i32,
    key: String,
    kind: &'static str,
    content_type: String,
    name: String,
    url_segment: Option<String>,
    path: String,
    draft: bool,
    updated: Option<String>,
    properties: BTreeMap<String, Value>,
}

impl From<&PublishedContent> for ContentView {
    fn from(content: &PublishedContent) -> Self {
        let properties = content
            .properties()
            .iter()
            .filter_map(|property| {
                property
                    .value("", "")
                    .map(|value| (property.alias().to_string(), value.clone()))
            })
            .collect();

        Self {
            id: content.id(),
            key: content.key().to_string(),
            kind: content.kind().as_str(),
            content_type: content.content_type().alias.clone(),
            name: content.name().to_string(),
            url_segment: content.url_segment().map(str::to_string),
            path: content.path().to_string(),
            draft: content.is_draft(),
            updated: content.update_date().format(&Rfc3339).ok(),
            properties,
        }
    }
}

#[derive(Serialize)]
struct MemberView {
    #[serde(flatten)]
    content: ContentView,
    email: String,
    username: String,
    approved: bool,
    locked_out: bool,
}

impl From<&PublishedMember> for MemberView {
    fn from(member: &PublishedMember) -> Self {
        Self {
            content: ContentView::from(member.content()),
            email: member.email().to_string(),
            username: member.username().to_string(),
            approved: member.is_approved(),
            locked_out: member.is_locked_out(),
        }
    }
}
