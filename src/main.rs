use clap::Parser;
use secret_keeper::cli::{Cli, Commands, DaemonAction, RotationAction};

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Init { generate_key } => {
            secret_keeper::cli::commands::init::execute(&cli, *generate_key)
        }
        Commands::Set {
            name,
            value,
            description,
            tag,
            credential,
        } => secret_keeper::cli::commands::set::execute(
            &cli,
            name,
            value.as_deref(),
            description.as_deref(),
            tag,
            *credential,
        ),
        Commands::Get { name } => secret_keeper::cli::commands::get::execute(&cli, name),
        Commands::List => secret_keeper::cli::commands::list::execute(&cli),
        Commands::Delete { name, force } => {
            secret_keeper::cli::commands::delete::execute(&cli, name, *force)
        }
        Commands::Destroy { force } => {
            secret_keeper::cli::commands::destroy::execute(&cli, *force)
        }
        Commands::Import { file, secrets_only } => {
            secret_keeper::cli::commands::import_cmd::execute(&cli, file, *secrets_only)
        }
        Commands::Export { output } => {
            secret_keeper::cli::commands::export::execute(&cli, output.as_deref())
        }
        Commands::Audit { last } => secret_keeper::cli::commands::audit_cmd::execute(&cli, *last),
        Commands::ChangeKey => secret_keeper::cli::commands::change_key::execute(&cli),
        Commands::Exec { command, cwd, timeout } => {
            secret_keeper::cli::commands::exec::execute(&cli, command, cwd.clone(), *timeout)
        }
        Commands::Daemon { action } => match action {
            DaemonAction::Start => secret_keeper::cli::commands::daemon_cmd::start(&cli),
            DaemonAction::Run => secret_keeper::cli::commands::daemon_cmd::run_foreground(&cli),
            DaemonAction::Stop => secret_keeper::cli::commands::daemon_cmd::stop(&cli),
            DaemonAction::Status => secret_keeper::cli::commands::daemon_cmd::status(&cli),
        },
        Commands::Rotation { action } => match action {
            RotationAction::Configure {
                name,
                provider,
                days,
                config,
            } => secret_keeper::cli::commands::rotation_cmd::configure(
                &cli, name, provider, *days, config,
            ),
            RotationAction::Enable { name } => {
                secret_keeper::cli::commands::rotation_cmd::enable(&cli, name)
            }
            RotationAction::Disable { name } => {
                secret_keeper::cli::commands::rotation_cmd::disable(&cli, name)
            }
            RotationAction::Delete { name } => {
                secret_keeper::cli::commands::rotation_cmd::delete(&cli, name)
            }
            RotationAction::List => secret_keeper::cli::commands::rotation_cmd::list(&cli),
            RotationAction::Now { name } => {
                secret_keeper::cli::commands::rotation_cmd::now(&cli, name)
            }
            RotationAction::Test { name } => {
                secret_keeper::cli::commands::rotation_cmd::test(&cli, name)
            }
            RotationAction::History { name, last } => {
                secret_keeper::cli::commands::rotation_cmd::history(&cli, name.as_deref(), *last)
            }
        },
        Commands::Auth { action } => match action {
            secret_keeper::cli::AuthAction::KeyfileGenerate => {
                secret_keeper::cli::commands::auth::keyfile_generate(&cli)
            }
            #[cfg(feature = "keyring-store")]
            secret_keeper::cli::AuthAction::Keyring { delete } => {
                secret_keeper::cli::commands::auth::keyring(&cli, *delete)
            }
        },
    };

    if let Err(e) = result {
        secret_keeper::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
