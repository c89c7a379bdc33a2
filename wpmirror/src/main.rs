mod config;
mod mirror;
mod paths;
mod run;
mod transports;

use std::process::ExitCode;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Cpanel { remote_dir: String },
    Sftp { password: String, remote_dir: String },
    Ftp { password: String, remote_dir: String },
    FtpProbe { password: Option<String> },
    SftpProbe { password: String },
    Help,
}

fn parse_cli<I>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().skip(1);
    let Some(command) = args.next() else {
        return Ok(Command::Help);
    };
    let parsed = match command.as_str() {
        "cpanel" => Command::Cpanel {
            remote_dir: args.next().unwrap_or_else(|| "/".to_string()),
        },
        "sftp" => Command::Sftp {
            password: args
                .next()
                .context("sftp requires <password> <remote_directory>")?,
            remote_dir: args
                .next()
                .context("sftp requires <password> <remote_directory>")?,
        },
        "ftp" => Command::Ftp {
            password: args
                .next()
                .context("ftp requires <password> <remote_directory>")?,
            remote_dir: args
                .next()
                .context("ftp requires <password> <remote_directory>")?,
        },
        "ftp-probe" => Command::FtpProbe {
            password: args.next(),
        },
        "sftp-probe" => Command::SftpProbe {
            password: args.next().context("sftp-probe requires <password>")?,
        },
        "--help" | "-h" | "help" => Command::Help,
        other => anyhow::bail!("unknown command: {other}"),
    };
    if let Some(extra) = args.next() {
        anyhow::bail!("unexpected argument: {extra}");
    }
    Ok(parsed)
}

fn print_usage() {
    println!("Usage: wpmirror <command>");
    println!();
    println!("Commands:");
    println!("  cpanel [remote_dir]           preview the account root over the cPanel API;");
    println!("                                mirror remote_dir when one is given");
    println!("  sftp <password> <remote_dir>  mirror remote_dir over SFTP");
    println!("  ftp <password> <remote_dir>   mirror remote_dir over plain FTP");
    println!("  ftp-probe [password]          FTP connectivity check; lists the root");
    println!("  sftp-probe <password>         SFTP connectivity check; lists the root");
    println!();
    println!("Hosts, the account user and the backup directory come from WPMIRROR_*");
    println!("environment variables (a .env file next to the binary is honored).");
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let command = match parse_cli(std::env::args()) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("[wpmirror] {err}");
            print_usage();
            return ExitCode::from(1);
        }
    };
    let result = match command {
        Command::Help => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Command::Cpanel { remote_dir } => run::cpanel(&remote_dir).await,
        Command::Sftp {
            password,
            remote_dir,
        } => run::sftp(&password, &remote_dir).await,
        Command::Ftp {
            password,
            remote_dir,
        } => run::ftp(&password, &remote_dir).await,
        Command::FtpProbe { password } => run::ftp_probe(password).await,
        Command::SftpProbe { password } => run::sftp_probe(&password).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[wpmirror] ✗ {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("wpmirror")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn no_arguments_shows_usage() {
        assert_eq!(parse_cli(args(&[])).unwrap(), Command::Help);
    }

    #[test]
    fn cpanel_defaults_to_root() {
        assert_eq!(
            parse_cli(args(&["cpanel"])).unwrap(),
            Command::Cpanel {
                remote_dir: "/".to_string()
            }
        );
        assert_eq!(
            parse_cli(args(&["cpanel", "public_html"])).unwrap(),
            Command::Cpanel {
                remote_dir: "public_html".to_string()
            }
        );
    }

    #[test]
    fn sftp_requires_both_positionals() {
        assert!(parse_cli(args(&["sftp"])).is_err());
        assert!(parse_cli(args(&["sftp", "hunter2"])).is_err());
        assert_eq!(
            parse_cli(args(&["sftp", "hunter2", "public_html"])).unwrap(),
            Command::Sftp {
                password: "hunter2".to_string(),
                remote_dir: "public_html".to_string()
            }
        );
    }

    #[test]
    fn ftp_probe_password_is_optional() {
        assert_eq!(
            parse_cli(args(&["ftp-probe"])).unwrap(),
            Command::FtpProbe { password: None }
        );
        assert_eq!(
            parse_cli(args(&["ftp-probe", "hunter2"])).unwrap(),
            Command::FtpProbe {
                password: Some("hunter2".to_string())
            }
        );
    }

    #[test]
    fn sftp_probe_requires_password() {
        assert!(parse_cli(args(&["sftp-probe"])).is_err());
    }

    #[test]
    fn unknown_command_and_trailing_arguments_are_rejected() {
        assert!(parse_cli(args(&["rsync"])).is_err());
        assert!(parse_cli(args(&["cpanel", "a", "b"])).is_err());
    }
}
