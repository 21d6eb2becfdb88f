use clap::{Parser, Subcommand};
use comanda::config::{AppConfig, ConfigError};
use comanda::router::{Navigation, NavigationError};
use comanda::routes::{LOGIN_PATH, RouteTable};
use comanda::session::AuthError;
use comanda::state::{AppState, StartupError};
use comanda::storage::StorageError;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("startup failed: {0}")]
    Startup(#[from] StartupError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
}

#[derive(Parser, Debug)]
#[command(name = "comanda", about = "Session and routing CLI for the comanda restaurant client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and land on the route for the user's role.
    Login {
        nombre: String,
        #[arg(long, env = "COMANDA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the local session.
    Logout,
    /// Show the locally stored session.
    Whoami,
    /// Resolve a path through the guard and print where it lands.
    Navigate { path: String },
    /// List the route table.
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config).await?;

    match cli.command {
        Command::Login { nombre, password } => {
            let role = state.session.login(&nombre, &password).await?;
            println!("logged in as {nombre} ({role})");
            print_navigation(&state.router.navigate(LOGIN_PATH)?);
        }
        Command::Logout => {
            state.session.logout()?;
            println!("logged out");
        }
        Command::Whoami => {
            state.session.check_auth()?;
            match state.session.user() {
                Some(user) => println!("{} ({})", user.name, user.role),
                None => println!("not logged in"),
            }
        }
        Command::Navigate { path } => print_navigation(&state.router.navigate(&path)?),
        Command::Routes => print_routes(state.router.table()),
    }
    Ok(())
}

fn print_navigation(nav: &Navigation) {
    for hop in &nav.redirected_from {
        println!("  {hop} ->");
    }
    println!("{}  [{}]", nav.location.path, nav.location.views.join(" > "));
}

fn print_routes(table: &RouteTable) {
    for entry in table.entries() {
        let auth = if entry.meta.requires_auth() { "auth" } else { "-" };
        let role = entry.meta.role.as_deref().unwrap_or("-");
        let target = match &entry.redirect {
            Some(to) => format!("=> {to}"),
            None => entry.views.join(" > "),
        };
        println!("{:<32} {auth:<5} {role:<14} {target}", entry.pattern);
    }
}
