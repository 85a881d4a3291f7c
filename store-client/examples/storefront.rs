// store-client/examples/storefront.rs

use shared::ProductQuery;
use store_client::{ClientConfig, HttpGateway, StoreGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env()?;
    let gateway = HttpGateway::new(config)?;

    let args: Vec<String> = std::env::args().collect();
    let token = match (args.get(1), args.get(2)) {
        (Some(email), Some(password)) => {
            let session = gateway.login(email, password).await?;
            let profile = gateway.me(&session.auth_token).await?;
            tracing::info!(email = %profile.email, is_admin = profile.is_admin, "logged in");
            Some(session.auth_token)
        }
        _ => {
            println!("Usage: storefront [email] [password]  (browsing anonymously)");
            None
        }
    };

    let products = gateway
        .list_products(token.as_deref(), &ProductQuery::default())
        .await?;
    for product in &products {
        println!(
            "{:>6} CLP  [{:>3} in stock]  {}",
            product.price,
            product.current_stock(),
            product.name
        );
    }

    if token.is_some() {
        let orders = gateway.list_orders_with_items(token.as_deref()).await?;
        println!("\n{} orders on record", orders.len());
        for order in orders.iter().take(5) {
            println!(
                "  {} {} — {} items, {} CLP, {}",
                order.order_number,
                order.display_name.as_deref().unwrap_or("Usuario"),
                order.items.len(),
                order.total_amount,
                order.status
            );
        }
    }

    Ok(())
}
