//! Show how a frame range is split into render chunks.

use farmjob_compiler::frames::{chunk, FrameSet};

pub fn run(frames: &str, size: i64) -> anyhow::Result<()> {
    let chunks = chunk(frames, size)?;
    let set = FrameSet::parse(frames)?;

    println!(
        "{} frame(s), span {}, {} chunk(s) of at most {size}",
        set.len(),
        set.span(),
        chunks.len()
    );
    for c in &chunks {
        println!("  {:<16} {}", c.hyphen(), c.dotted());
    }

    Ok(())
}
