//! perfil — command-line front for the profile-sync core.
//!
//! A thin presentation shim: it forwards user intents (register, login,
//! show, update, delete) into the session layer and prints whatever the
//! core exposes. All state-machine and validation logic lives below it.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use perfil_core::{
  clock::{Clock as _, SystemClock},
  profile::{Profile, ProfileFields, RegistrationFields},
  validate,
};
use perfil_session::{ProfileRepository, ProfileView, SessionCoordinator};
use perfil_store_sqlite::{SqliteIdentityGateway, SqliteStore};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// How long to wait for the live subscription to deliver a snapshot.
const SNAPSHOT_DEADLINE: Duration = Duration::from_secs(5);

type Coordinator = SessionCoordinator<SqliteIdentityGateway, SqliteStore>;

#[derive(Parser)]
#[command(author, version, about = "Perfil profile manager")]
struct Cli {
  /// Path to the SQLite database file.
  #[arg(short, long, default_value = "perfil.db")]
  store: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create an account and its profile.
  Register {
    #[arg(long)]
    correo:          String,
    #[arg(long)]
    contrasena:      String,
    #[arg(long)]
    nombre:          String,
    #[arg(long)]
    titulo:          String,
    #[arg(long)]
    anio_graduacion: String,
  },

  /// Sign in and print the current profile.
  Show {
    #[arg(long)]
    correo:     String,
    #[arg(long)]
    contrasena: String,
  },

  /// Sign in and edit profile fields; omitted flags keep their value.
  Update {
    #[arg(long)]
    correo:          String,
    #[arg(long)]
    contrasena:      String,
    #[arg(long)]
    nombre:          Option<String>,
    #[arg(long)]
    nuevo_correo:    Option<String>,
    #[arg(long)]
    titulo:          Option<String>,
    #[arg(long)]
    anio_graduacion: Option<String>,
  },

  /// Sign in and delete the profile (the account remains).
  Delete {
    #[arg(long)]
    correo:     String,
    #[arg(long)]
    contrasena: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let store = Arc::new(
    SqliteStore::open(&cli.store)
      .await
      .context("failed to open profile store")?,
  );
  let gateway = Arc::new(
    SqliteIdentityGateway::open(&cli.store)
      .await
      .context("failed to open account store")?,
  );
  let coordinator =
    SessionCoordinator::new(Arc::clone(&gateway), Arc::clone(&store));
  let repository = ProfileRepository::new(Arc::clone(&store));

  match cli.command {
    Command::Register { correo, contrasena, nombre, titulo, anio_graduacion } => {
      let registration = RegistrationFields {
        contrasena: contrasena.clone(),
        profile:    ProfileFields {
          nombre,
          correo: correo.clone(),
          titulo,
          anio_graduacion,
        },
      };

      // Pre-submit check: reject before touching the identity service.
      validate::validate_registration(
        &registration,
        SystemClock.current_year(),
      )?;

      let identity = coordinator.sign_up(&correo, &contrasena).await?;

      // Sign-up and profile creation are two steps, not a transaction; a
      // failure here leaves an account with no profile and must say so.
      match repository.create(&identity, &registration.profile).await {
        Ok(id) => println!("registered; profile {id}"),
        Err(e) => anyhow::bail!(
          "account created, but profile creation failed: {e}"
        ),
      }
    }

    Command::Show { correo, contrasena } => {
      coordinator.sign_in(&correo, &contrasena).await?;
      match first_snapshot(&coordinator).await? {
        Some(profile) => print_profile(&profile),
        None => println!("no profile document yet"),
      }
      coordinator.sign_out().await?;
    }

    Command::Update {
      correo,
      contrasena,
      nombre,
      nuevo_correo,
      titulo,
      anio_graduacion,
    } => {
      coordinator.sign_in(&correo, &contrasena).await?;
      let current = first_snapshot(&coordinator)
        .await?
        .context("no profile to update")?;

      let fields = ProfileFields {
        nombre:          nombre.unwrap_or_else(|| current.nombre.clone()),
        correo:          nuevo_correo
          .unwrap_or_else(|| current.correo.clone()),
        titulo:          titulo.unwrap_or_else(|| current.titulo.clone()),
        anio_graduacion: anio_graduacion
          .unwrap_or_else(|| current.anio_graduacion.to_string()),
      };

      // Grab a listener before the write so the refreshed snapshot is not
      // missed; the write itself only confirms durable acceptance.
      let mut updates =
        coordinator.profile_updates().context("not signed in")?;
      repository.update(&current.id, &fields).await?;

      match next_snapshot(&mut updates).await? {
        Some(profile) => print_profile(&profile),
        None => println!("profile disappeared concurrently"),
      }
      coordinator.sign_out().await?;
    }

    Command::Delete { correo, contrasena } => {
      coordinator.sign_in(&correo, &contrasena).await?;
      let current = first_snapshot(&coordinator)
        .await?
        .context("no profile to delete")?;

      let mut updates =
        coordinator.profile_updates().context("not signed in")?;
      repository.delete(&current.id).await?;

      // The store's push channel confirms the removal.
      if next_snapshot(&mut updates).await?.is_none() {
        println!("profile deleted; the account remains");
      }
      coordinator.sign_out().await?;
    }
  }

  Ok(())
}

/// The initial reconciled snapshot after signing in.
async fn first_snapshot(
  coordinator: &Coordinator,
) -> anyhow::Result<ProfileView> {
  let mut rx = coordinator.profile_updates().context("not signed in")?;
  next_snapshot(&mut rx).await
}

async fn next_snapshot(
  rx: &mut tokio::sync::broadcast::Receiver<ProfileView>,
) -> anyhow::Result<ProfileView> {
  let view = tokio::time::timeout(SNAPSHOT_DEADLINE, rx.recv())
    .await
    .context("timed out waiting for a profile snapshot")??;
  Ok(view)
}

fn print_profile(p: &Profile) {
  println!("{}", p.nombre);
  println!("  correo:     {}", p.correo);
  println!("  titulo:     {}", p.titulo);
  println!("  graduación: {}", p.anio_graduacion);
  println!("  creado:     {}", p.creado.format("%Y-%m-%d"));
}
