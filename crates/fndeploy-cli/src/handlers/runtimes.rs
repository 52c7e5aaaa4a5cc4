//! Runtimes command handler.

use fndeploy_core::RuntimeIdentifier;

/// Lines listing each supported Go version with its runtime identifier.
pub fn runtime_table() -> Vec<String> {
    let mut lines = vec![format!("{:<10}{}", "GO", "RUNTIME")];
    lines.extend(
        RuntimeIdentifier::ALL
            .iter()
            .map(|runtime| format!("{:<10}{}", runtime.go_version(), runtime)),
    );
    lines
}

/// Execute the runtimes command.
pub fn execute() {
    for line in runtime_table() {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_every_runtime() {
        let table = runtime_table();
        assert_eq!(table.len(), RuntimeIdentifier::ALL.len() + 1);
        assert_eq!(table[1], "1.13      go113");
        assert!(table.last().unwrap().ends_with("go121"));
    }
}
