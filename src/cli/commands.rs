use std::env;
use std::sync::Arc;

use crate::cli::interaction::FormResult;
use crate::cli::output::{self, OutputPreferences};
use crate::cli::runner::WizardRunner;
use crate::cli::terminal::TerminalInteraction;
use crate::cli::test_mode;
use crate::config::ConfigManager;
use crate::errors::CliError;
use crate::features::{find_wizard, registry, suggest};
use crate::query::ListQuery;
use crate::storage::{DraftStore, JsonDraftStore};
use crate::utils::build_info;

pub const COMMANDS: [&str; 6] = ["list", "run", "drafts", "discard", "version", "help"];

pub fn usage() -> &'static str {
    "Usage: gofast_wish_cli <command>\n\
     Commands:\n  \
     list                        Show available wizards\n  \
     run <wizard> [--resume]     Fill in a wizard, optionally from its saved draft\n  \
     drafts [--query <qs>]       List saved drafts (q, sort, page, per_page)\n  \
     discard <wizard>            Delete a wizard's draft\n  \
     version                     Print build information"
}

/// Parses the arguments after the program name and runs the command.
pub async fn dispatch(args: Vec<String>) -> Result<(), CliError> {
    configure_output();
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        println!("{}", usage());
        return Ok(());
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "list" => list(),
        "run" => {
            let name = positional(&rest, "run <wizard>")?;
            run(name, has_flag(&rest, "--resume")).await
        }
        "drafts" => drafts(flag_value(&rest, "--query")?),
        "discard" => discard(positional(&rest, "discard <wizard>")?),
        "version" | "--version" | "-V" => {
            println!("{}", build_info::current().summary());
            Ok(())
        }
        "help" | "--help" | "-h" => {
            println!("{}", usage());
            Ok(())
        }
        other => Err(CliError::Input(match suggest(other, &COMMANDS) {
            Some(candidate) => format!("unknown command `{}` (did you mean `{}`?)", other, candidate),
            None => format!("unknown command `{}`", other),
        })),
    }
}

fn configure_output() {
    output::set_preferences(OutputPreferences {
        plain_mode: test_mode::is_enabled() || env::var_os("NO_COLOR").is_some(),
        quiet_mode: false,
    });
}

fn positional<'a>(args: &'a [String], usage: &str) -> Result<&'a str, CliError> {
    args.iter()
        .find(|arg| !arg.starts_with("--"))
        .map(String::as_str)
        .ok_or_else(|| CliError::Input(format!("missing argument: {}", usage)))
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

/// Value of `--flag value` or `--flag=value`.
fn flag_value(args: &[String], flag: &str) -> Result<Option<String>, CliError> {
    let prefix = format!("{}=", flag);
    for (index, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Ok(Some(value.to_string()));
        }
        if arg == flag {
            return args
                .get(index + 1)
                .cloned()
                .map(Some)
                .ok_or_else(|| CliError::Input(format!("{} needs a value", flag)));
        }
    }
    Ok(None)
}

fn list() -> Result<(), CliError> {
    output::section("Wizards");
    for wizard in registry() {
        println!(
            "  {:<16} {} ({} steps) {}",
            wizard.name(),
            wizard.title(),
            wizard.steps().len(),
            wizard.summary()
        );
    }
    Ok(())
}

async fn run(name: &str, resume: bool) -> Result<(), CliError> {
    let wizard = find_wizard(name)?;
    let config = ConfigManager::new()?.load()?;
    let options = config.wizard_options();
    let store = Arc::new(JsonDraftStore::new_default()?);

    let runner = WizardRunner::new(wizard.as_ref())
        .with_store(store)
        .with_options(options.clone())
        .with_locale(config.currency_code(), config.locale_config());
    let initial = runner.initial_values(resume)?;
    let mut interaction = TerminalInteraction::new(&options);

    match runner.run(&mut interaction, initial).await? {
        FormResult::Completed(result) => {
            output::success(format!("{} completed", wizard.title()));
            let json = serde_json::to_string_pretty(&result)
                .map_err(|err| CliError::Command(err.to_string()))?;
            println!("{}", json);
        }
        FormResult::Cancelled => output::info(format!("{} cancelled", wizard.title())),
    }
    Ok(())
}

fn drafts(query: Option<String>) -> Result<(), CliError> {
    let query = match query {
        Some(raw) => ListQuery::decode(&raw)?,
        None => ListQuery::default(),
    };
    let store = JsonDraftStore::new_default()?;
    let page = query.apply(store.list()?);

    if page.total == 0 {
        output::info("No drafts saved.");
        return Ok(());
    }
    output::section("Drafts");
    for info in &page.items {
        println!(
            "  {:<16} step {:<3} {:>3} fields  saved {}",
            info.wizard,
            info.step + 1,
            info.fields,
            info.saved_at.format("%Y-%m-%d %H:%M")
        );
    }
    output::info(format!(
        "Page {} of {} ({} drafts)",
        page.page, page.pages, page.total
    ));
    let encoded = query.encode();
    if !encoded.is_empty() {
        output::info(format!("Query: {}", encoded));
    }
    Ok(())
}

fn discard(name: &str) -> Result<(), CliError> {
    let store = JsonDraftStore::new_default()?;
    if store.discard(name)? {
        output::success(format!("Draft for `{}` discarded", name));
    } else {
        output::warning(format!("No draft saved for `{}`", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn positional_skips_flags() {
        let rest = args(&["--resume", "goal"]);
        assert_eq!(positional(&rest, "run <wizard>").unwrap(), "goal");
        assert!(has_flag(&rest, "--resume"));
        assert!(positional(&args(&["--resume"]), "run <wizard>").is_err());
    }

    #[test]
    fn flag_value_supports_both_forms() {
        assert_eq!(
            flag_value(&args(&["--query", "sort=wizard"]), "--query").unwrap(),
            Some("sort=wizard".into())
        );
        assert_eq!(
            flag_value(&args(&["--query=page=2"]), "--query").unwrap(),
            Some("page=2".into())
        );
        assert_eq!(flag_value(&args(&[]), "--query").unwrap(), None);
        assert!(flag_value(&args(&["--query"]), "--query").is_err());
    }

    #[tokio::test]
    async fn unknown_command_suggests_closest() {
        let err = dispatch(args(&["lst"])).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: unknown command `lst` (did you mean `list`?)"
        );
    }
}
