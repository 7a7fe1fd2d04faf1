use crate::report::{
    run_attendance_today, run_distance, run_geofence_evaluate, AttendanceTodayArgs, DistanceArgs,
    GeofenceEvaluateArgs,
};
use crate::server;
use attendance_gate::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Attendance Gate",
    about = "Run the attendance geofence service or inspect geofence decisions from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate office geofences
    Geofence {
        #[command(subcommand)]
        command: GeofenceCommand,
    },
    /// Inspect attendance records held by the backend
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommand,
    },
}

#[derive(Subcommand, Debug)]
enum GeofenceCommand {
    /// Resolve the nearest office for a department from a reported position
    Evaluate(GeofenceEvaluateArgs),
    /// Great-circle distance in meters between two coordinates
    Distance(DistanceArgs),
}

#[derive(Subcommand, Debug)]
enum AttendanceCommand {
    /// Show today's attendance card and check-out gate for an employee
    Today(AttendanceTodayArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Geofence {
            command: GeofenceCommand::Evaluate(args),
        } => run_geofence_evaluate(args).await,
        Command::Geofence {
            command: GeofenceCommand::Distance(args),
        } => run_distance(args),
        Command::Attendance {
            command: AttendanceCommand::Today(args),
        } => run_attendance_today(args).await,
    }
}
