use std::{env, env::VarError};

/// The server takes no arguments. If any are given, prints the help text and the configuration environment, and
/// returns true so that the caller can exit.
pub fn handle_command_line_args() -> bool {
    let wants_help = env::args().len() > 1;
    if wants_help {
        print_help();
        print_config_envs();
    }
    wants_help
}

fn print_help() {
    const HELP: &str = include_str!("./cli-help.txt");
    println!("\n{HELP}\n");
}

fn print_config_envs() {
    // An explicit list, so that nothing unrelated from the environment ends up on screen
    const DISPLAY_ENVS: [&str; 8] = [
        "RUST_LOG",
        "LPG_DATABASE_URL",
        "LPG_ACCRUAL_SYSTEM_ADDRESS",
        "LPG_ACCRUAL_REQUEST_TIMEOUT",
        "LPG_WORKER_POOL_SIZE",
        "LPG_SUBMISSION_QUEUE_SIZE",
        "LPG_SHUTDOWN_GRACE_PERIOD",
        "LPG_RESUBMIT_ON_START",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
