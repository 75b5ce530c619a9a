use std::io::Read;

/// `vigil hook`: read the hook payload from stdin, dispatch, relay output.
///
/// Internal errors exit 0: the host agent must never be blocked by an
/// auditing failure. Only a deliberate block decision exits nonzero.
pub fn execute() -> anyhow::Result<()> {
    let mut stdin_buf = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut stdin_buf) {
        debug_log(&format!("STDIN READ ERROR: {e}"));
        return Ok(());
    }

    debug_log(&format!(
        "STDIN({} bytes): {}",
        stdin_buf.len(),
        &stdin_buf[..stdin_buf.len().min(200)]
    ));

    match vigil_bridge::hook_entrypoint_from_stdin(&stdin_buf, None) {
        Ok(result) => {
            if let Some(output) = &result.stdout {
                debug_log(&format!("OK output({} bytes)", output.len()));
                println!("{output}");
            }
            if let Some(message) = &result.stderr {
                eprintln!("{message}");
            }
            if result.exit_code != 0 {
                std::process::exit(result.exit_code);
            }
            Ok(())
        }
        Err(e) => {
            debug_log(&format!("ERROR: {e}"));
            // Exit 0 on internal errors, never block the host agent
            Ok(())
        }
    }
}

fn debug_log(msg: &str) {
    if std::env::var_os("VIGIL_DEBUG").is_none() {
        return;
    }
    use std::io::Write;
    let log_path = std::env::temp_dir().join("vigil-hook-debug.log");
    if let Ok(mut f) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let ts = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        let _ = writeln!(f, "[{ts}] {msg}");
    }
}
