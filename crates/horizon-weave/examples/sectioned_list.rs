//! A sectioned list built from two providers, printed as it changes.
//!
//! Run with `RUST_LOG=horizon_weave=debug` to see the composite's logging.

use std::sync::Arc;

use horizon_weave::prelude::*;
use tracing_subscriber::EnvFilter;

fn render(list: &CompositeList) {
    let rows: Vec<String> = list
        .snapshot()
        .iter()
        .map(|entry| match entry {
            FlatEntry::Title(title) => format!("== {title} =="),
            FlatEntry::Pending => "...".to_owned(),
            FlatEntry::Item(item) => item
                .item::<String>()
                .cloned()
                .or_else(|| item.item::<u32>().map(u32::to_string))
                .unwrap_or_default(),
        })
        .collect();
    println!("{}", rows.join(" | "));
}

fn main() -> Result<(), ComposeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let fruit = Arc::new(VecProvider::new(
        vec!["apple".to_owned(), "pear".to_owned()],
        ViewType::new(1),
    ));
    let scores = Arc::new(VecProvider::new(vec![3u32, 1, 2], ViewType::new(2)));

    let list = CompositeList::with_config(CompositeConfig::new().with_hide_titles_when_empty(true));
    list.signals().changed.connect(|op| println!("  {op:?}"));
    list.signals()
        .failed
        .connect(|err| eprintln!("  provider error: {err}"));

    list.register_with_title(fruit.clone(), "Fruit")?;
    list.register_with_title(scores.clone(), "Scores")?;
    render(&list);

    fruit.insert(1, "fig".to_owned());
    render(&list);

    scores.set_items(vec![1, 2, 3]);
    render(&list);

    list.set_pending(true)?;
    render(&list);

    fruit.clear();
    render(&list);

    Ok(())
}
