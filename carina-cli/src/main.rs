use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use carina_core::config::{self, BackendConfig, ParsedFile};
use carina_core::differ::{create_plan, destroy_plan};
use carina_core::effect::Effect;
use carina_core::interpreter::{EffectOutcome, Interpreter};
use carina_core::plan::Plan;
use carina_core::provider::{Provider, ProviderConfig};
use carina_core::resource::{Resource, ResourceId, State, Value};
use carina_core::schema::ResourceSchema;
use carina_provider_instatus::InstatusProvider;
use carina_state::{LockInfo, StateBackend, StateFile, create_backend};

const DEFAULT_CONFIG: &str = "main.toml";

#[derive(Parser)]
#[command(name = "carina")]
#[command(about = "Manage Instatus status page components declaratively", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Destroy all resources recorded in state
    Destroy {
        /// Path to the configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Update state from the remote service
    Refresh {
        /// Path to the configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Bring an existing remote object under management
    Import {
        /// Resource type (e.g., instatus_component)
        resource_type: String,
        /// Resource name in the configuration
        name: String,
        /// Remote identifier (`<component_id>` or `<page_id>/<component_id>`)
        import_id: String,

        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// State inspection commands
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List resources recorded in state
    List {
        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply { file } => run_apply(&file).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Refresh { file } => run_refresh(&file).await,
        Commands::Import {
            resource_type,
            name,
            import_id,
            file,
        } => run_import(&file, &resource_type, &name, &import_id).await,
        Commands::State { command } => match command {
            StateCommands::List { file } => run_state_list(&file).await,
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(file: &Path) -> Result<ParsedFile, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;

    config::parse(&content).map_err(|e| format!("Parse error in {}: {}", file.display(), e))
}

fn get_schemas(provider: &dyn Provider) -> HashMap<String, ResourceSchema> {
    provider
        .resource_types()
        .into_iter()
        .map(|t| (t.type_name(provider.name()), t.schema()))
        .collect()
}

/// Check provider blocks and every resource against its schema
fn validate_parsed(
    parsed: &ParsedFile,
    provider: &dyn Provider,
    schemas: &HashMap<String, ResourceSchema>,
) -> Result<(), String> {
    let mut all_errors = Vec::new();

    for block in &parsed.providers {
        if block.name != provider.name() {
            all_errors.push(format!("Unknown provider: {}", block.name));
        }
    }

    for resource in &parsed.resources {
        match schemas.get(&resource.id.resource_type) {
            Some(schema) => {
                if let Err(errors) = schema.validate(&resource.attributes) {
                    for error in errors {
                        all_errors.push(format!("{}: {}", resource.id, error));
                    }
                }
            }
            None => all_errors.push(format!(
                "{}: Unknown resource type: {}",
                resource.id, resource.id.resource_type
            )),
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Validation failed:\n  {}", all_errors.join("\n  ")))
    }
}

fn configured_provider(parsed: &ParsedFile) -> Result<InstatusProvider, String> {
    let mut provider = InstatusProvider::new();
    let config = parsed
        .provider(provider.name())
        .cloned()
        .unwrap_or_else(|| ProviderConfig::new(provider.name()));
    provider.configure(&config).map_err(|e| e.to_string())?;
    Ok(provider)
}

async fn open_backend(parsed: &ParsedFile) -> Result<Box<dyn StateBackend>, String> {
    let config = parsed.backend.clone().unwrap_or_else(|| BackendConfig {
        backend_type: "local".to_string(),
        attributes: HashMap::new(),
    });
    let backend = create_backend(&config).await.map_err(|e| e.to_string())?;
    backend.init().await.map_err(|e| e.to_string())?;
    Ok(backend)
}

/// Locked access to the state file for commands that modify it
struct Session {
    backend: Box<dyn StateBackend>,
    lock: LockInfo,
    state: StateFile,
}

impl Session {
    async fn open(parsed: &ParsedFile, operation: &str) -> Result<Self, String> {
        let backend = open_backend(parsed).await?;
        let lock = backend
            .acquire_lock(operation)
            .await
            .map_err(|e| e.to_string())?;

        match backend.read_state().await {
            Ok(state) => Ok(Self {
                backend,
                lock,
                state: state.unwrap_or_default(),
            }),
            Err(e) => {
                if let Err(release) = backend.release_lock(&lock).await {
                    log::warn!("failed to release lock {}: {}", lock.id, release);
                }
                Err(e.to_string())
            }
        }
    }

    async fn save(&mut self) -> Result<(), String> {
        self.state.increment_serial();
        self.backend
            .write_state(&self.state)
            .await
            .map_err(|e| format!("Failed to write state: {}", e))
    }

    async fn close(self) -> Result<(), String> {
        self.backend
            .release_lock(&self.lock)
            .await
            .map_err(|e| format!("Failed to release lock: {}", e))
    }
}

/// Refresh every recorded state from the remote service, in name order
async fn refresh_states(
    provider: &dyn Provider,
    states: &HashMap<ResourceId, State>,
) -> Result<HashMap<ResourceId, State>, String> {
    let mut ids: Vec<&ResourceId> = states.keys().collect();
    ids.sort_by(|a, b| (&a.resource_type, &a.name).cmp(&(&b.resource_type, &b.name)));

    let mut refreshed = HashMap::new();
    for id in ids {
        let state = provider
            .read(&states[id])
            .await
            .map_err(|e| format!("Failed to read state: {}", e))?;
        refreshed.insert(id.clone(), state);
    }
    Ok(refreshed)
}

/// Plan configured resources through their schema against current state
fn build_plan(
    resources: &[Resource],
    current: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let planned: Vec<Resource> = resources
        .iter()
        .map(|r| match schemas.get(&r.id.resource_type) {
            Some(schema) => schema.plan(r, current.get(&r.id)),
            None => r.clone(),
        })
        .collect();

    create_plan(&planned, current, schemas)
}

fn record_outcome(state: &mut StateFile, outcome: &EffectOutcome, provider: &str) {
    match outcome {
        EffectOutcome::Read { state: s }
        | EffectOutcome::Created { state: s }
        | EffectOutcome::Updated { state: s } => state.record(s, provider),
        EffectOutcome::Deleted { id } => {
            state.remove_resource(&id.resource_type, &id.name);
        }
        EffectOutcome::Skipped { .. } => {}
    }
}

/// Execute a plan effect by effect, recording each result in the session
///
/// Stops at the first failure. Returns the number of applied effects.
async fn execute_plan<P: Provider>(
    interpreter: &Interpreter<P>,
    plan: &Plan,
    session: &mut Session,
) -> Result<usize, String> {
    let provider_name = interpreter.provider().name();
    let mut success_count = 0;
    let mut failure = None;

    for effect in plan.effects() {
        match interpreter.execute_effect(effect).await {
            Ok(outcome) => {
                record_outcome(&mut session.state, &outcome, provider_name);
                println!("  {} {}", "✓".green(), effect);
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), effect, e);
                failure = Some(e);
                break;
            }
        }
    }

    session.save().await?;

    match failure {
        None => Ok(success_count),
        Some(e) => Err(format!(
            "{} of {} changes applied before failure: {}",
            success_count,
            plan.mutation_count(),
            e
        )),
    }
}

fn run_validate(file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;
    let provider = InstatusProvider::new();
    let schemas = get_schemas(&provider);

    println!("{}", "Validating...".cyan());

    validate_parsed(&parsed, &provider, &schemas)?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            parsed.resources.len()
        )
        .green()
        .bold()
    );

    for resource in &parsed.resources {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;
    let provider = configured_provider(&parsed)?;
    let schemas = get_schemas(&provider);
    validate_parsed(&parsed, &provider, &schemas)?;

    let backend = open_backend(&parsed).await?;
    let state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    let current = refresh_states(&provider, &state.states()).await?;
    let plan = build_plan(&parsed.resources, &current, &schemas);
    print_plan(&plan);
    Ok(())
}

async fn run_apply(file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;
    let provider = configured_provider(&parsed)?;
    let schemas = get_schemas(&provider);
    validate_parsed(&parsed, &provider, &schemas)?;

    let mut session = Session::open(&parsed, "apply").await?;
    let result = apply_with(provider, &parsed, &schemas, &mut session).await;
    session.close().await?;
    result
}

async fn apply_with(
    provider: InstatusProvider,
    parsed: &ParsedFile,
    schemas: &HashMap<String, ResourceSchema>,
    session: &mut Session,
) -> Result<(), String> {
    let current = refresh_states(&provider, &session.state.states()).await?;
    for state in current.values() {
        session.state.record(state, provider.name());
    }

    let plan = build_plan(&parsed.resources, &current, schemas);

    if plan.is_empty() {
        session.save().await?;
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan);
    println!();

    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let interpreter = Interpreter::new(provider);
    let applied = execute_plan(&interpreter, &plan, session).await?;

    println!();
    println!(
        "{}",
        format!("Apply complete! {} changes applied.", applied)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_destroy(file: &Path, auto_approve: bool) -> Result<(), String> {
    let parsed = load_config(file)?;
    let provider = configured_provider(&parsed)?;

    let mut session = Session::open(&parsed, "destroy").await?;
    let result = destroy_with(provider, auto_approve, &mut session).await;
    session.close().await?;
    result
}

async fn destroy_with(
    provider: InstatusProvider,
    auto_approve: bool,
    session: &mut Session,
) -> Result<(), String> {
    let mut states: Vec<State> = session.state.states().into_values().collect();
    states.sort_by(|a, b| {
        (&a.id.resource_type, &a.id.name).cmp(&(&b.id.resource_type, &b.id.name))
    });
    let plan = destroy_plan(&states);

    if plan.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.mutation_count().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let interpreter = Interpreter::new(provider);
    let destroyed = execute_plan(&interpreter, &plan, session).await?;

    println!();
    println!(
        "{}",
        format!("Destroy complete! {} resources destroyed.", destroyed)
            .green()
            .bold()
    );
    Ok(())
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input.trim() == "yes")
}

async fn run_refresh(file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;
    let provider = configured_provider(&parsed)?;

    let mut session = Session::open(&parsed, "refresh").await?;
    let result = refresh_with(&provider, &mut session).await;
    session.close().await?;
    result
}

async fn refresh_with(provider: &InstatusProvider, session: &mut Session) -> Result<(), String> {
    let refreshed = refresh_states(provider, &session.state.states()).await?;
    for state in refreshed.values() {
        session.state.record(state, provider.name());
    }
    session.save().await?;

    println!(
        "{}",
        format!("Refresh complete! {} resources refreshed.", refreshed.len())
            .green()
            .bold()
    );
    Ok(())
}

async fn run_import(
    file: &Path,
    resource_type: &str,
    name: &str,
    import_id: &str,
) -> Result<(), String> {
    let parsed = load_config(file)?;
    let provider = configured_provider(&parsed)?;
    let schemas = get_schemas(&provider);
    if !schemas.contains_key(resource_type) {
        return Err(format!("Unknown resource type: {}", resource_type));
    }

    let id = ResourceId::new(resource_type, name);
    let mut session = Session::open(&parsed, "import").await?;
    let result = import_with(&provider, &parsed, &id, import_id, &mut session).await;
    session.close().await?;

    let state = result?;
    println!(
        "{}",
        format!(
            "Import complete! {} is now managed (ID: {}).",
            id,
            state.identifier.as_deref().unwrap_or(import_id)
        )
        .green()
        .bold()
    );
    Ok(())
}

async fn import_with(
    provider: &InstatusProvider,
    parsed: &ParsedFile,
    id: &ResourceId,
    import_id: &str,
    session: &mut Session,
) -> Result<State, String> {
    if session
        .state
        .find_resource(&id.resource_type, &id.name)
        .is_some()
    {
        return Err(format!(
            "{} is already managed; remove it from state before importing",
            id
        ));
    }

    let mut imported = provider
        .import(id, import_id)
        .await
        .map_err(|e| e.to_string())?;
    fill_configured_page_id(&mut imported, parsed);

    let state = provider.read(&imported).await.map_err(|e| e.to_string())?;
    session.state.record(&state, provider.name());
    session.save().await?;
    Ok(state)
}

/// A bare component id carries no page; take it from the configuration
fn fill_configured_page_id(imported: &mut State, parsed: &ParsedFile) {
    if !imported.attributes.contains_key("page_id")
        && let Some(page_id) = parsed
            .resources
            .iter()
            .find(|r| r.id == imported.id)
            .and_then(|r| r.attributes.get("page_id"))
    {
        imported
            .attributes
            .insert("page_id".to_string(), page_id.clone());
    }
}

async fn run_state_list(file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;
    let backend = open_backend(&parsed).await?;
    let state = backend.read_state().await.map_err(|e| e.to_string())?;

    let Some(state) = state.filter(|s| !s.resources.is_empty()) else {
        println!("{}", "No resources in state.".yellow());
        return Ok(());
    };

    let mut resources: Vec<_> = state.resources.iter().collect();
    resources.sort_by(|a, b| (&a.resource_type, &a.name).cmp(&(&b.resource_type, &b.name)));
    for resource in resources {
        match &resource.identifier {
            Some(identifier) => println!(
                "{}.{} {}",
                resource.resource_type,
                resource.name,
                format!("({})", identifier).dimmed()
            ),
            None => println!("{}.{}", resource.resource_type, resource.name),
        }
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        print_effect(effect);
    }

    println!();
    let summary = plan.summary();
    println!(
        "Plan: {} to add, {} to change, {} to destroy.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.delete.to_string().red()
    );
}

fn print_effect(effect: &Effect) {
    let attr_prefix = "      ";

    match effect {
        Effect::Create(r) => {
            println!("  {} {}", "+".green().bold(), r.id.to_string().cyan().bold());
            for key in sorted_keys(&r.attributes) {
                let value = format_value(&r.attributes[key]);
                if key == "name" {
                    println!("{}{}: {}", attr_prefix, key.bold(), value.white().bold());
                } else {
                    println!("{}{}: {}", attr_prefix, key, value.green());
                }
            }
        }
        Effect::Update { id, from, to } => {
            println!("  {} {}", "~".yellow().bold(), id.to_string().cyan().bold());
            for key in sorted_keys(&to.attributes) {
                let new_value = &to.attributes[key];
                let old_value = from.attributes.get(key);
                if old_value == Some(new_value) {
                    continue;
                }
                let old_str = old_value
                    .map(format_value)
                    .unwrap_or_else(|| "(none)".to_string());
                println!(
                    "{}{}: {} → {}",
                    attr_prefix,
                    key,
                    old_str.red(),
                    format_value(new_value).green()
                );
            }
        }
        Effect::Delete(state) => {
            println!("  {} {}", "-".red().bold(), state.id.to_string().cyan().bold());
            if let Some(identifier) = &state.identifier {
                println!("{}{}: {}", attr_prefix, "id".bold(), identifier.red().bold());
            }
        }
        Effect::Read(_) => {}
    }
}

/// Attribute keys with `name` first, then alphabetical; internal keys hidden
fn sorted_keys(attributes: &HashMap<String, Value>) -> Vec<&String> {
    let mut keys: Vec<_> = attributes.keys().filter(|k| !k.starts_with('_')).collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    keys
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut strs: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
    }
}
