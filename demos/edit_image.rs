//! Image editing example - applies an instruction to a local image.
//!
//! Run with: `cargo run --example edit_image -- <input.jpg> "add a llama"`
//!
//! Requires `GEMINI_API_KEY` environment variable.

use editify::{Config, EditOutcome, SourceImage};

#[tokio::main]
async fn main() -> editify::Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args
        .next()
        .expect("Usage: edit_image <input.jpg> <instruction>");
    let instruction = args.next().unwrap_or_else(|| "add a llama".to_string());
    let key = std::env::var("GEMINI_API_KEY").unwrap_or_default();

    let image = SourceImage::from_path(&input_path)?;
    let bridge = Config::from_env()?.build_bridge()?;

    match bridge.generate(&key, image.to_base64(), &instruction).await {
        EditOutcome::Success(edited) => {
            edited.save("edited.jpg")?;
            if let Some(text) = &edited.text {
                println!("{text}");
            }
            println!("Edited image saved to edited.jpg");
        }
        EditOutcome::Failure(err) => eprintln!("Edit failed: {err}"),
    }

    Ok(())
}
