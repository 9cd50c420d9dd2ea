//! Mode interactif: lecture de commandes sur l'entrée standard
//!
//! La connexion reste ouverte pendant toute la session. Un premier Ctrl+C
//! interrompt la commande en cours (ou la saisie), un second quitte.

use std::io::Write;

use anyhow::Result;
use geotab::ExportFormat;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, error};

use crate::cli::{print_result, read_query_argument, save_output, OutputTarget};
use crate::db::Session;
use crate::describe::{describe_table, list_tables};
use crate::query::{fetch_table, run_query, QueryOutput, TableRef};

const PROMPT: &str = ">> ";
const CONTINUATION_PROMPT: &str = ">>>\"";

/// Réglages modifiables pendant la session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplState {
    pub geometry_column: Option<String>,
    pub use_centroids: bool,
    pub execute_as_is: bool,
}

impl ReplState {
    pub fn new(geometry_column: Option<String>, use_centroids: bool, execute_as_is: bool) -> Self {
        Self {
            geometry_column,
            use_centroids,
            execute_as_is,
        }
    }

    pub fn help(&self) -> String {
        format!(
            "Commands available:\n\
             \tq, \\q, quit, exit - quit application\n\
             \t<query/filename> [> filename] - execute one-lined select query (and save the result to file if given)\n\
             \t\"<query/filename>\" [> filename] - execute select query, possibly multi-line (and save the result to file if given)\n\
             \t\\s <table_name> [> filename] - select * from table name (and save the result to file if given)\n\
             \t\\dt [schema] - list tables in the given schema, or in all schemas if not given\n\
             \t\\d [schema.]<table> - get table description\n\
             \t\\geometry_column, \\g <column> - change geometry column [current: {}]\n\
             \t\\use_centroids, \\c - switch centroids usage on selecting tables [current: {}]\n\
             \t\\execute_as_is, \\r - switch raw execution trigger [current: {}]\n\
             \thelp - show this message",
            self.geometry_column.as_deref().unwrap_or(geotab::DEFAULT_GEOMETRY_COLUMN),
            self.use_centroids,
            self.execute_as_is,
        )
    }
}

/// Commande interactive analysée
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    Help,
    ListTables { schema: Option<String> },
    Describe { table: Option<String> },
    Select { table: Option<String>, output: Option<String> },
    SetGeometryColumn { column: Option<String> },
    ToggleCentroids,
    ToggleExecuteAsIs,
    Query { query: String, output: Option<String> },
    /// Requête entre guillemets dont la fin n'a pas encore été saisie
    Incomplete(String),
}

/// Analyse une ligne (ou un bloc entre guillemets déjà complété)
pub fn parse_command(input: &str) -> Command {
    let line = input.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    match head {
        "" => Command::Empty,
        "q" | "\\q" | "quit" | "exit" if rest.is_empty() => Command::Quit,
        "help" if rest.is_empty() => Command::Help,
        "\\dt" => Command::ListTables {
            schema: rest.split_whitespace().next().map(str::to_string),
        },
        "\\d" => Command::Describe {
            table: rest.split_whitespace().next().map(str::to_string),
        },
        "\\g" | "\\geometry_column" => Command::SetGeometryColumn {
            column: rest.split_whitespace().next().map(str::to_string),
        },
        "\\c" | "\\use_centroids" => Command::ToggleCentroids,
        "\\r" | "\\execute_as_is" => Command::ToggleExecuteAsIs,
        "\\s" => match argument {
            Some(arg) => {
                let (table, output) = split_redirect(&arg, arg.rfind('>'));
                Command::Select {
                    table: (!table.is_empty()).then_some(table),
                    output,
                }
            }
            None => Command::Select {
                table: None,
                output: None,
            },
        },
        _ if line.starts_with('"') => match parse_quoted(line) {
            Some((query, output)) => Command::Query { query, output },
            None => Command::Incomplete(line.to_string()),
        },
        _ => {
            let (query, output) = split_redirect(line, line.find('>'));
            Command::Query { query, output }
        }
    }
}

/// Sépare `texte > fichier` à la position donnée
fn split_redirect(text: &str, at: Option<usize>) -> (String, Option<String>) {
    match at {
        Some(pos) => {
            let target = clean_target(&text[pos + 1..]);
            (text[..pos].trim().to_string(), target)
        }
        None => (text.trim().to_string(), None),
    }
}

fn clean_target(target: &str) -> Option<String> {
    let target = target.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    (!target.is_empty()).then(|| target.to_string())
}

/// Requête entre guillemets, suivie éventuellement de `> fichier`
///
/// `None` tant que le guillemet fermant n'est pas saisi.
pub fn parse_quoted(text: &str) -> Option<(String, Option<String>)> {
    let text = text.trim();
    let body = text.strip_prefix('"')?;

    // `"requête" > fichier`: le dernier '>' précédé d'un guillemet fermant
    if let Some(pos) = body.rfind('>') {
        let before = body[..pos].trim_end();
        if let Some(query) = before.strip_suffix('"') {
            if let Some(target) = clean_target(&body[pos + 1..]) {
                return Some((query.trim().to_string(), Some(target)));
            }
        }
    }

    body.strip_suffix('"').map(|query| (query.trim().to_string(), None))
}

/// Boucle principale du mode interactif
pub async fn run(session: &mut Session, mut state: ReplState) -> Result<()> {
    println!("You are in interactive mode.\n{}", state.help());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupted = false;

    loop {
        let line = match read_line(&mut lines, PROMPT).await? {
            Input::Line(line) => line,
            Input::Eof => break,
            Input::Interrupted => {
                if interrupted {
                    println!("Second Ctrl+C, exiting");
                    break;
                }
                interrupted = true;
                println!("Ctrl+C hit, interrupting. Use it again or type 'exit' to exit interactive mode");
                continue;
            }
        };

        let command = match parse_command(&line) {
            Command::Incomplete(buffer) => read_continuation(&mut lines, buffer).await?,
            command => command,
        };

        if command == Command::Quit {
            break;
        }

        tokio::select! {
            result = execute(session, &mut state, command) => {
                if let Err(e) = result {
                    println!("{e:#}");
                }
                interrupted = false;
            }
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                println!("Ctrl+C hit, command aborted. Use it again or type 'exit' to exit interactive mode");
            }
        }
    }

    Ok(())
}

/// Complète une requête entre guillemets ligne par ligne
async fn read_continuation(lines: &mut Lines<BufReader<Stdin>>, mut buffer: String) -> Result<Command> {
    loop {
        match read_line(lines, CONTINUATION_PROMPT).await? {
            Input::Line(next) => {
                buffer.push('\n');
                buffer.push_str(&next);
                if let Some((query, output)) = parse_quoted(&buffer) {
                    return Ok(Command::Query { query, output });
                }
            }
            Input::Eof => return Ok(Command::Empty),
            Input::Interrupted => {
                println!("Ctrl+C hit, aborting query");
                return Ok(Command::Empty);
            }
        }
    }
}

enum Input {
    Line(String),
    Eof,
    Interrupted,
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<Input> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    tokio::select! {
        line = lines.next_line() => Ok(match line? {
            Some(line) => Input::Line(line),
            None => Input::Eof,
        }),
        _ = tokio::signal::ctrl_c() => {
            println!();
            Ok(Input::Interrupted)
        }
    }
}

async fn execute(session: &mut Session, state: &mut ReplState, command: Command) -> Result<()> {
    match command {
        Command::Empty | Command::Quit | Command::Incomplete(_) => {}
        Command::Help => println!("{}", state.help()),
        Command::ListTables { schema } => {
            let tables = list_tables(session, schema.as_deref()).await?;
            print_result(&tables, false);
        }
        Command::Describe { table: None } => println!("You must use \\d with table name after it, aborting"),
        Command::Describe { table: Some(table) } => {
            let table: TableRef = table.parse()?;
            let descriptor = describe_table(session, &table).await?;
            print_result(&descriptor.to_result_set(), false);
        }
        Command::SetGeometryColumn { column: None } => {
            println!("You must use \\g with column name after it, aborting")
        }
        Command::SetGeometryColumn { column: Some(column) } => {
            println!("Switched geometry column to \"{column}\"");
            state.geometry_column = Some(column);
        }
        Command::ToggleCentroids => {
            state.use_centroids = !state.use_centroids;
            println!("Centroid usage is switched to: {}", state.use_centroids);
        }
        Command::ToggleExecuteAsIs => {
            state.execute_as_is = !state.execute_as_is;
            println!("Executing raw statements is changed to: {}", state.execute_as_is);
        }
        Command::Select { table: None, .. } => println!("You must use \\s with table name after it, aborting"),
        Command::Select {
            table: Some(table),
            output,
        } => {
            let table: TableRef = table.parse()?;
            debug!(table = %table, output = ?output, "Selecting table");
            let result = fetch_table(session, &table, state.use_centroids).await?;
            show_and_save(&result, output.as_deref(), state)?;
        }
        Command::Query { query, output } => {
            let query = read_query_argument(&query)?;
            debug!(query = %query, output = ?output, "Executing query");
            let result = run_query(session, &query, state.execute_as_is).await?;
            show_and_save(&result, output.as_deref(), state)?;
        }
    }
    Ok(())
}

fn show_and_save(result: &QueryOutput, output: Option<&str>, state: &ReplState) -> Result<()> {
    print_result(&result.data, true);
    if let Some(output) = output {
        let target = OutputTarget::parse(output);
        if target == OutputTarget::Stdout {
            error!("Writing to stdout is not available in interactive mode");
            return Ok(());
        }
        save_output(result, &target, state.geometry_column.as_deref(), ExportFormat::Csv)?;
    }
    Ok(())
}
