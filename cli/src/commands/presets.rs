use super::ui::print_header;
use agentcfg_pipeline::Preset;
use anyhow::Result;
use yansi::Paint;

pub fn handle_presets() -> Result<()> {
    print_header("Presets");
    for preset in Preset::ALL {
        println!("{}  {}", preset.as_str().cyan().bold(), preset.description());
        println!(
            "    max_tokens {}  max_iterations {}  tools {}",
            preset.max_tokens(),
            preset.max_iterations(),
            preset.required_tools().join(", ")
        );
    }
    Ok(())
}
