//! `gymcoach resolve`: exercise names to library ids.

use gymcoach_agent::resolve_exercises;
use gymcoach_exercises::ExerciseRef;
use std::path::Path;

pub async fn run(names: &[String], create: bool, data: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let store = super::load_store(data)?;

    let entries: Vec<ExerciseRef> = names.iter().map(|n| ExerciseRef::by_name(n.as_str())).collect();
    let report = resolve_exercises(&*store, &config.resolution, &entries, create).await?;

    for mapped in &report.mapped {
        println!("  ✓ {} → #{} {} ({:?})", mapped.input, mapped.exercise_id, mapped.name, mapped.method);
    }
    for review in &report.needs_review {
        if review.suggestions.is_empty() {
            println!("  ? {} → no match", review.input);
            continue;
        }
        let suggestions: Vec<String> = review
            .suggestions
            .iter()
            .map(|s| format!("#{} {} ({:.2})", s.exercise_id, s.name, s.score))
            .collect();
        println!("  ? {} → {}", review.input, suggestions.join(", "));
    }
    for created in &report.created {
        println!("  + created #{} {}", created.id, created.name);
    }
    Ok(())
}
