use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    playlist: Option<String>,
    config_dir: Option<PathBuf>,
    ready_timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    klanginsel::app::run_with_startup(klanginsel::app::AppStartupOptions {
        config_root: args.config_dir,
        playlist: args.playlist,
        ready_timeout_ms: args.ready_timeout_ms,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--playlist" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--playlist requires a playlist key");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--playlist cannot be empty");
                }
                out.playlist = Some(value.trim().to_string());
            }
            "--config-dir" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--config-dir requires a path");
                };
                out.config_dir = Some(PathBuf::from(value));
            }
            "--ready-timeout-ms" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--ready-timeout-ms requires a number");
                };
                let timeout = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| anyhow::anyhow!("invalid --ready-timeout-ms {value}: {err}"))?;
                out.ready_timeout_ms = Some(timeout);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Klanginsel {}", klanginsel::config::APP_VERSION);
    println!("  --playlist key          Open a playlist directly (chillout, reggae)");
    println!("  --config-dir path       Use another settings directory");
    println!("  --ready-timeout-ms n    Give up on the player after n milliseconds");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_all_options() {
        let parsed = parse_args(args(&[
            "--playlist",
            "reggae",
            "--config-dir",
            "/tmp/k",
            "--ready-timeout-ms",
            "500",
        ]))
        .expect("parse");
        assert_eq!(parsed.playlist.as_deref(), Some("reggae"));
        assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/k")));
        assert_eq!(parsed.ready_timeout_ms, Some(500));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(args(&["--playlist"])).is_err());
        assert!(parse_args(args(&["--ready-timeout-ms", "soon"])).is_err());
        assert!(parse_args(args(&["--volume"])).is_err());
    }
}
