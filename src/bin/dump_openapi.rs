use std::fs;

fn main() -> anyhow::Result<()> {
    let doc = gatekeeper::docs::build_openapi(8000)?;
    fs::write("openapi.json", serde_json::to_string_pretty(&doc)?)?;
    println!("wrote openapi.json");
    Ok(())
}
