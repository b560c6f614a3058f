use chanemit::*;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result {
    let emitter = Emitter::default();

    // Two handlers accepting the same argument type
    let greet = Handler::new(|name: String| format!("Hello, {name}!")).with_name("greet");
    let count = Handler::new(|name: String| name.len()).with_name("count");
    let channels = emitter.register("hello", [greet, count]).await?;

    // One batch, one result per matching handler
    channels.emit.emit(args![String::from("World")]).await?;
    for _ in 0..2 {
        if let Some(result) = channels.receive.recv().await {
            println!("{result}");
        }
    }

    // Nothing takes an i32: a single empty result comes back
    channels.emit.emit(args![42]).await?;
    if let Some(result) = channels.receive.recv().await {
        println!("unmatched: {}", result.is_unmatched());
    }

    // Graceful shutdown (every accepted batch is dispatched first)
    emitter.shutdown().await;
    Ok(())
}
