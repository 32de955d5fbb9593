//! Wire format of the evaluation command and its marker-delimited reply

/// Character the REPL prints when idle
pub const PROMPT_MARKER: u8 = b'>';

/// Ctrl-C, breaks the REPL out of whatever it is running
pub const INTERRUPT: u8 = 0x03;

/// Ctrl-P, clears the REPL's input line and suppresses echo of the command
pub const CLEAR_LINE: u8 = 0x10;

/// Printed before the JSON result
pub const RESULT_START: &[u8] = b"< <<";

/// Printed after the JSON result
pub const RESULT_END: &[u8] = b">> >";

/// Build the command that prints `expr` as JSON between the result markers
///
/// The markers are split into separate `console.log` arguments so the echoed
/// command line itself never contains them.
pub fn eval_command(expr: &str) -> Vec<u8> {
    let mut cmd = vec![CLEAR_LINE];
    cmd.extend_from_slice(
        format!("console.log(\"<\",\"<<\",JSON.stringify({expr}),\">>\",\">\")\n").as_bytes(),
    );
    cmd
}

/// Remove the first complete `< <<payload>> >` span from `buffer`
///
/// Returns the payload, or `None` (leaving `buffer` untouched) if no start
/// marker is followed by an end marker yet.
pub fn extract_result(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = find(buffer, RESULT_START, 0)?;
    let payload_start = start + RESULT_START.len();
    let end = find(buffer, RESULT_END, payload_start)?;

    let payload = buffer[payload_start..end].to_vec();
    buffer.drain(start..end + RESULT_END.len());
    Some(payload)
}

/// True if the most recent byte is the prompt marker
pub fn ends_with_prompt(buffer: &[u8]) -> bool {
    buffer.last() == Some(&PROMPT_MARKER)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}
