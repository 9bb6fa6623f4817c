use std::path::PathBuf;

use dbdesk::BuilderSurface;

use crate::config::default_config_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Tables,
    Describe,
    Browse,
    Build,
    Exec,
    Sql,
    Backup,
    Restore,
}

/// Options every command accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    pub config: PathBuf,
    /// `--config` was given explicitly.
    pub config_explicit: bool,
    pub database: Option<String>,
    /// Print JSON instead of tables.
    pub json: bool,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            config: default_config_path(),
            config_explicit: false,
            database: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help(HelpTopic),
    Run(GlobalArgs, Action),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Tables,
    Describe {
        table: String,
    },
    Browse {
        table: String,
        page: u64,
        per_page: Option<u64>,
    },
    /// Build (and preview) a statement from a JSON query spec.
    Build {
        spec: Input,
        surface: BuilderSurface,
    },
    /// Run a statement produced by `build`.
    Exec {
        statement: Input,
        yes: bool,
    },
    Sql {
        sql: String,
        confirm: Option<String>,
    },
    Backup {
        tables: Vec<String>,
        structure: bool,
        data: bool,
        output: Option<PathBuf>,
    },
    Restore {
        input: Input,
    },
}

/// A file path or `-` for stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    fn parse(v: &str) -> Self {
        if v == "-" {
            Input::Stdin
        } else {
            Input::File(PathBuf::from(v))
        }
    }

    pub fn read(&self) -> anyhow::Result<String> {
        match self {
            Input::Stdin => {
                let mut buf = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
                Ok(buf)
            }
            Input::File(path) => std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display())),
        }
    }
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1).map(|s| s.as_str());
    let mut global = GlobalArgs::default();
    let mut command: Option<&str> = None;
    let mut positional: Vec<&str> = Vec::new();

    let mut page: u64 = 1;
    let mut per_page: Option<u64> = None;
    let mut surface = BuilderSurface::default();
    let mut yes = false;
    let mut confirm: Option<String> = None;
    let mut tables: Vec<String> = Vec::new();
    let mut structure = true;
    let mut data = true;
    let mut output: Option<PathBuf> = None;

    while let Some(token) = it.next() {
        let (flag, inline) = match token.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f, Some(v.to_string())),
            _ => (token, None),
        };
        let mut value = |name: &str| -> anyhow::Result<String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => it
                    .next()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("{name} requires a value")),
            }
        };

        match flag {
            "-h" | "--help" => return Ok(Command::Help(help_topic(command)?)),
            "--config" => {
                global.config = PathBuf::from(value("--config")?);
                global.config_explicit = true;
            }
            "--database" => global.database = Some(value("--database")?),
            "--json" => global.json = true,
            "--page" => page = parse_number("--page", &value("--page")?)?,
            "--per-page" => per_page = Some(parse_number("--per-page", &value("--per-page")?)?),
            "--surface" => surface = value("--surface")?.parse()?,
            "--yes" | "-y" => yes = true,
            "--confirm" => confirm = Some(value("--confirm")?),
            "--tables" => tables = split_csv(&value("--tables")?),
            "--no-structure" => structure = false,
            "--no-data" => data = false,
            "--output" | "-o" => output = Some(PathBuf::from(value("--output")?)),
            other if other.starts_with('-') && other != "-" => {
                anyhow::bail!("unknown argument: {other}")
            }
            other if command.is_none() => command = Some(other),
            other => positional.push(other),
        }
    }

    let Some(command) = command else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    let one = |what: &str| -> anyhow::Result<String> {
        match positional.as_slice() {
            [v] => Ok(v.to_string()),
            [] => anyhow::bail!("missing {what}: run `dbdesk {command} --help`"),
            _ => anyhow::bail!("expected a single {what}, got {}", positional.len()),
        }
    };
    let none = || -> anyhow::Result<()> {
        match positional.first() {
            Some(extra) => anyhow::bail!("unexpected argument: {extra}"),
            None => Ok(()),
        }
    };

    let action = match command {
        "tables" => {
            none()?;
            Action::Tables
        }
        "describe" => Action::Describe {
            table: one("table name")?,
        },
        "browse" => Action::Browse {
            table: one("table name")?,
            page,
            per_page,
        },
        "build" => Action::Build {
            spec: Input::parse(&one("spec file")?),
            surface,
        },
        "exec" => Action::Exec {
            statement: Input::parse(&one("statement file")?),
            yes,
        },
        "sql" => Action::Sql {
            sql: one("SQL text")?,
            confirm,
        },
        "backup" => {
            none()?;
            if !structure && !data {
                anyhow::bail!("--no-structure and --no-data leave nothing to back up");
            }
            Action::Backup {
                tables,
                structure,
                data,
                output,
            }
        }
        "restore" => Action::Restore {
            input: Input::parse(&one("backup file")?),
        },
        other => anyhow::bail!("unknown command: {other}"),
    };

    Ok(Command::Run(global, action))
}

fn help_topic(command: Option<&str>) -> anyhow::Result<HelpTopic> {
    Ok(match command {
        None => HelpTopic::Root,
        Some("tables") => HelpTopic::Tables,
        Some("describe") => HelpTopic::Describe,
        Some("browse") => HelpTopic::Browse,
        Some("build") => HelpTopic::Build,
        Some("exec") => HelpTopic::Exec,
        Some("sql") => HelpTopic::Sql,
        Some("backup") => HelpTopic::Backup,
        Some("restore") => HelpTopic::Restore,
        Some(other) => anyhow::bail!("unknown command: {other}"),
    })
}

fn parse_number(flag: &str, v: &str) -> anyhow::Result<u64> {
    v.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{flag} expects a non-negative integer, got {v:?}"))
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn print_help(topic: HelpTopic) {
    const GLOBAL: &str = "\
GLOBAL OPTIONS:
  --config <FILE>       Config file path (default: dbdesk.toml)
  --database <URL>      Database URL (overrides config and DATABASE_URL)
  --json                Print JSON instead of tables
  -h, --help            Print help";

    match topic {
        HelpTopic::Root => {
            println!(
                "\
dbdesk - database admin client

USAGE:
  dbdesk <COMMAND> [OPTIONS]

COMMANDS:
  tables                List tables
  describe <table>      Show the columns of a table
  browse <table>        Page through a table
  build <spec.json>     Build a statement from a query spec and preview it
  exec <stmt.json>      Run a statement produced by `build`
  sql <SQL>             Run free-text SQL
  backup                Dump tables as SQL
  restore <file.sql>    Replay a dump in one transaction

{GLOBAL}

Run `dbdesk <command> --help` for more."
            );
        }
        HelpTopic::Tables => {
            println!(
                "\
USAGE:
  dbdesk tables [OPTIONS]

{GLOBAL}"
            );
        }
        HelpTopic::Describe => {
            println!(
                "\
USAGE:
  dbdesk describe <table> [OPTIONS]

{GLOBAL}"
            );
        }
        HelpTopic::Browse => {
            println!(
                "\
USAGE:
  dbdesk browse <table> [OPTIONS]

OPTIONS:
  --page <N>            Page number, starting at 1 (default: 1)
  --per-page <N>        Rows per page, 1..=1000 (default: admin.page_size)

{GLOBAL}"
            );
        }
        HelpTopic::Build => {
            println!(
                "\
USAGE:
  dbdesk build <spec.json | -> [OPTIONS]

NOTES:
  The spec is a JSON object such as
    {{\"kind\": \"Update\", \"table\": \"orders\",
     \"assignments\": [{{\"column\": \"status\", \"value\": \"archived\"}}],
     \"predicates\": [{{\"column\": \"id\", \"operator\": \"=\", \"value\": \"7\"}}]}}
  UPDATE and DELETE are previewed: affected row count plus a sample.

OPTIONS:
  --surface <NAME>      basic | advanced | bulk (default: basic)

{GLOBAL}"
            );
        }
        HelpTopic::Exec => {
            println!(
                "\
USAGE:
  dbdesk exec <stmt.json | -> [OPTIONS]

NOTES:
  Accepts the JSON printed by `dbdesk build --json` or a bare statement.
  The statement is checked again before it runs.

OPTIONS:
  -y, --yes             Confirm a destructive statement (UPDATE / DELETE)

{GLOBAL}"
            );
        }
        HelpTopic::Sql => {
            println!(
                "\
USAGE:
  dbdesk sql <SQL> [OPTIONS]

OPTIONS:
  --confirm <PHRASE>    Confirmation phrase for DROP / DELETE FROM / TRUNCATE TABLE

{GLOBAL}"
            );
        }
        HelpTopic::Backup => {
            println!(
                "\
USAGE:
  dbdesk backup [OPTIONS]

OPTIONS:
  --tables <CSV>        Tables to dump (default: all)
  --no-structure        Skip DROP / CREATE TABLE statements
  --no-data             Skip INSERT statements
  -o, --output <FILE>   Write the dump to a file (default: stdout)

{GLOBAL}"
            );
        }
        HelpTopic::Restore => {
            println!(
                "\
USAGE:
  dbdesk restore <file.sql | -> [OPTIONS]

NOTES:
  All statements run in one transaction; nothing is kept if one fails.

{GLOBAL}"
            );
        }
    }
}
