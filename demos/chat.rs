use futures::StreamExt;
use ollama_adapter::{Message, Model, ModelClient, OllamaClient, Options, Payload};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = OllamaClient::from_env();
    let chat_model = Model::ollama_chat("llama3.2");

    // Non-streaming chat
    let payload = Payload::chat(chat_model.name(), &[Message::user("Why is the sky blue? One sentence.")])?;
    let mut options = Options::new();
    options.insert("temperature".into(), json!(0.2));
    options.insert("num_predict".into(), json!(64));

    let result = client.request(&chat_model, payload, options).await?;
    let data = result.into_data().await?;
    println!("Answer: {}\n", data["message"]["content"]);

    // Streaming chat
    let payload = Payload::chat(chat_model.name(), &[Message::user("Count to five.")])?;
    let mut options = Options::new();
    options.insert("stream".into(), json!(true));

    let result = client.request(&chat_model, payload, options).await?;
    let mut chunks = Box::pin(result.into_data_stream().await?);
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        print!("{}", chunk["message"]["content"].as_str().unwrap_or_default());
    }
    println!("\n");

    // Embeddings
    let embed_model = Model::ollama_embedding("embeddinggemma");
    let mut options = Options::new();
    options.insert("dimensions".into(), json!(256));

    let result = client.request(&embed_model, Payload::from("hello"), options).await?;
    let data = result.into_data().await?;
    let vectors = data["embeddings"].as_array().map(Vec::len).unwrap_or_default();
    println!("Received {vectors} embedding vector(s)");

    Ok(())
}
