use mecab_rs::{Tagger, TaggerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Uses MECAB_LIBRARY_PATH when set, otherwise the usual install locations.
    let mut tagger = Tagger::new(&TaggerConfig::default())?;

    let text = "すもももももももものうち";
    let lattice = tagger.parse(text)?;

    for node in lattice.morphemes() {
        println!(
            "{}\t{} (stat={:?}, len={}, rlen={}, posid={}, wcost={}, cost={})",
            node.surface(),
            node.feature(),
            node.stat(),
            node.length(),
            node.rlength(),
            node.posid(),
            node.wcost(),
            node.cost()
        );
    }

    let kept = lattice.to_owned_result();
    tagger.release();
    println!("kept {} nodes after release", kept.len());

    Ok(())
}
