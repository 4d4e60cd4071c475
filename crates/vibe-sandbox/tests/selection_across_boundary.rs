use vibe_document::Document;
use vibe_sandbox::{spawn_sandbox, ClickDisposition};

const GENERATED: &str = r#"```html
<!DOCTYPE html>
<html><head><script src="https://cdn.tailwindcss.com"></script></head>
<body>
  <header><nav><a href="/">Home</a></nav></header>
  <section><h1>Bakery</h1><p>Fresh bread</p><img data-image-prompt="loaf of bread"></section>
  <button onclick="location.href='/order'">Order</button>
</body></html>
```"#;

#[tokio::test]
async fn every_box_reports_its_own_id() {
    let document = Document::from_generated(GENERATED);
    let boxes = document.boxes();
    assert_eq!(boxes.len(), 8);

    let (frame, mut host) = spawn_sandbox();
    frame.render(document.clone()).await.unwrap();
    frame.set_edit_mode(true).await.unwrap();

    for b in &boxes {
        assert_eq!(frame.click(b.element_index).await.unwrap(), ClickDisposition::Suppressed);
        let selection = host.next_selection().await.unwrap();
        assert_eq!(selection.id, b.id);
    }
    assert_eq!(host.rejected(), 0);
}

#[tokio::test]
async fn selection_ids_do_not_survive_a_new_generation() {
    let (frame, mut host) = spawn_sandbox();
    frame.set_edit_mode(true).await.unwrap();
    frame.render(Document::from_generated(GENERATED)).await.unwrap();

    let next = Document::from_generated("<section><p>Only one paragraph</p></section>");
    frame.render(next).await.unwrap();

    // element 1 is now the paragraph, box 2
    frame.click(1).await.unwrap();
    assert_eq!(host.next_selection().await.unwrap().id.get(), 2);

    let snapshot = frame.snapshot().await.unwrap();
    assert!(!snapshot.markup.contains("Bakery"));
    assert!(snapshot.markup.contains("BOX_SELECTED"));
}
