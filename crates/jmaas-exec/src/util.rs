use tokio::process::Command;

/// Build a command for `program` with host-specific argument escaping applied.
pub fn cmd_program(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(fix_arguments(args));
    cmd
}

/// Arguments as the host's process launcher needs them.
pub fn fix_arguments(args: &[String]) -> Vec<String> {
    cfg_if::cfg_if! {
        if #[cfg(target_family = "windows")] {
            quote_empty(args)
        } else {
            args.to_vec()
        }
    }
}

/// Replace empty arguments with `""`; the Windows launcher drops them otherwise.
#[cfg_attr(not(target_family = "windows"), allow(dead_code))]
pub(crate) fn quote_empty(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|a| if a.is_empty() { "\"\"".to_string() } else { a.clone() })
        .collect()
}
