//! Prompt library commands

use anyhow::{anyhow, Result};
use tally_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

pub fn cmd_prompts_list(library: &mut PromptLibrary) -> Result<()> {
    println!();
    println!("🧾 Prompts");
    println!("   {:<24} {:>3}  {:<16} SOURCE", "ID", "VER", "TASK");
    println!("   ─────────────────────────────────────────────────────────");

    for info in library.list() {
        let source = match info.override_path {
            Some(ref path) => format!("override ({})", path.display()),
            None => "built-in".to_string(),
        };
        println!(
            "   {:<24} {:>3}  {:<16} {}",
            info.id, info.version, info.task_type, source
        );
    }

    let dir = library
        .override_dir()
        .cloned()
        .or_else(default_prompts_dir);
    println!();
    match dir {
        Some(dir) => println!("   Overrides are read from {}/<id>.md", dir.display()),
        None => println!("   No data directory available for overrides"),
    }
    Ok(())
}

pub fn cmd_prompts_show(library: &mut PromptLibrary, prompt_id: &str) -> Result<()> {
    let id: PromptId = prompt_id.parse().map_err(|e: String| {
        let known: Vec<&str> = PromptId::all().iter().map(PromptId::as_str).collect();
        anyhow!("{} (known prompts: {})", e, known.join(", "))
    })?;
    let prompt = library.get(id)?;

    println!(
        "{} v{} [{}] {}",
        prompt.metadata.id,
        prompt.metadata.version,
        prompt.metadata.task_type,
        if prompt.is_override { "override" } else { "built-in" }
    );
    if let Some(ref path) = prompt.override_path {
        println!("from {}", path.display());
    }
    println!();
    println!("{}", prompt.content);
    Ok(())
}
