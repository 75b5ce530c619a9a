use std::path::Path;
use vigil_report::format_duration;

/// `vigil status`: active session and headline statistics.
pub fn execute(project_dir: &Path) -> anyhow::Result<()> {
    let Some(session_id) = vigil_session::get_active_session(project_dir) else {
        println!("no active session");
        return Ok(());
    };

    let records = vigil_session::read_session_records(&session_id, project_dir);
    let stats = vigil_aggregate::session_statistics(&records);

    println!("active session: {session_id}");
    println!("  tool calls:    {}", stats.total_events);
    println!("  user prompts:  {}", stats.user_prompts);
    println!("  files touched: {}", stats.files_touched);
    println!("  warnings:      {}", stats.warnings);
    println!("  blocked:       {}", stats.blocked);
    println!("  duration:      {}", format_duration(stats.duration_seconds));

    if !stats.tools_used.is_empty() {
        let mut tools: Vec<(&String, &u64)> = stats.tools_used.iter().collect();
        tools.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let line = tools
            .iter()
            .map(|(tool, count)| format!("{tool}({count})"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  tools:         {line}");
    }

    Ok(())
}
