use denti_core::error::DentiError;
use serde::Serialize;

pub fn print<T: Serialize>(summary: &T) -> Result<(), DentiError> {
    let json = serde_json::to_string_pretty(summary)?;
    println!("{json}");
    Ok(())
}
