//! Resource paths on the planning server's REST API.
//!
//! Object names appear inside OData key literals (`Chores('name')`), where a
//! single quote is escaped by doubling it. The quoted name is then
//! percent-encoded so that spaces and reserved characters survive the URL.

/// Query option expanding tasks with just enough of each process to name it.
pub const TASK_EXPAND: &str = "Tasks($expand=*,Process($select=Name),Chore($select=Name))";

/// Collection of every chore.
pub const CHORES: &str = "/Chores";

/// Escape and percent-encode a name for use inside `('...')`.
pub fn quote_key(name: &str) -> String {
    urlencoding::encode(&name.replace('\'', "''")).into_owned()
}

/// Inverse of [`quote_key`].
pub fn unquote_key(encoded: &str) -> Option<String> {
    urlencoding::decode(encoded)
        .ok()
        .map(|decoded| decoded.replace("''", "'"))
}

/// `/Chores('<name>')`
pub fn chore(name: &str) -> String {
    format!("{CHORES}('{}')", quote_key(name))
}

/// `/Chores('<name>')` with tasks expanded.
pub fn chore_expanded(name: &str) -> String {
    format!("{}?$expand={TASK_EXPAND}", chore(name))
}

/// `/Chores` with tasks expanded.
pub fn chores_expanded() -> String {
    format!("{CHORES}?$expand={TASK_EXPAND}")
}

/// `/Chores?$select=Name`
pub fn chore_names() -> String {
    format!("{CHORES}?$select=Name")
}

/// `/Chores('<name>')/Tasks`
pub fn tasks(chore_name: &str) -> String {
    format!("{}/Tasks", chore(chore_name))
}

/// `/Chores('<name>')/Tasks` with processes expanded.
pub fn tasks_expanded(chore_name: &str) -> String {
    format!(
        "{}?$expand=*,Process($select=Name),Chore($select=Name)",
        tasks(chore_name)
    )
}

/// `/Chores('<name>')/Tasks(<step>)`
pub fn task(chore_name: &str, step: usize) -> String {
    format!("{}/Tasks({step})", chore(chore_name))
}

/// `/Chores('<name>')/tm1.<action>` bound action.
pub fn chore_action(name: &str, action: &str) -> String {
    format!("{}/tm1.{action}", chore(name))
}

/// OData binding reference to a process, used inside task bodies.
pub fn process_bind(process_name: &str) -> String {
    format!("Processes('{}')", quote_key(process_name))
}

/// Compare two object names the way the server does: case-insensitive,
/// spaces ignored.
pub fn names_equal(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}
