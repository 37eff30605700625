use mecab_rs::{Tagger, TaggerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TaggerConfig::default()
        .with_node_format("%m\\t%f[0]\\n")
        .with_unk_format("%m\\t(unknown)\\n")
        .with_eos_format("--\\n");
    let mut tagger = Tagger::new(&config)?;

    let text = "吾輩は猫である。名前はまだ無い。";
    let lattice = tagger.parse(text)?;
    for node in lattice.iter() {
        print!("{}", node.tagger().format_or_default(&node));
    }

    let cloned = lattice.to_owned_result();
    let tagger_ref = lattice.tagger();
    for node in cloned.morphemes().take(3) {
        print!("cloned: {}", tagger_ref.format_cloned_or_default(&cloned, node));
    }

    print!("{}", tagger.parse_to_string(text)?);
    Ok(())
}
