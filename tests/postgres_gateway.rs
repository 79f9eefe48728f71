//! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.
//! Each test gets a fresh database with the migrations applied.

use sqlx::PgPool;

use gestion_backend::dtos::customer::CustomerDraft;
use gestion_backend::dtos::product::ProductDraft;
use gestion_backend::gateway::{Gateway, GatewayError, OrderStore, PgGateway};
use gestion_backend::models::order::{OrderLine, OrderPlan, OrderStatus};
use gestion_backend::models::product::Product;

async fn seed(gw: &PgGateway, stock: i32) -> (i64, Product) {
    let customer = gw
        .customers()
        .insert(&CustomerDraft { name: "Ana".into(), ..Default::default() })
        .await
        .unwrap();
    let product = gw
        .products()
        .insert(&ProductDraft {
            name: "Yerba".into(),
            price: Some(10.0),
            stock,
            category: "Almacén".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    (customer.id, product)
}

fn plan(customer_id: i64, product: &Product, quantity: i32) -> OrderPlan {
    OrderPlan {
        id: None,
        customer_id,
        description: None,
        status: OrderStatus::Pending,
        lines: vec![OrderLine {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
        }],
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn order_save_takes_stock_and_rolls_back_on_shortage(pool: PgPool) {
    let gw = PgGateway::new(pool);
    let (customer_id, yerba) = seed(&gw, 5).await;

    let order = gw.save_order(&plan(customer_id, &yerba, 3)).await.unwrap();
    assert_eq!(order.total(), 30.0);
    assert_eq!(order.customer_name.as_deref(), Some("Ana"));
    assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 2);

    let err = gw.save_order(&plan(customer_id, &yerba, 3)).await.unwrap_err();
    assert_eq!(err, GatewayError::InsufficientStock { product: "Yerba".into() });
    assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 2);
    assert_eq!(gw.list_orders().await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn editing_an_order_returns_previous_quantities_first(pool: PgPool) {
    let gw = PgGateway::new(pool);
    let (customer_id, yerba) = seed(&gw, 10).await;

    let saved = gw.save_order(&plan(customer_id, &yerba, 4)).await.unwrap();
    assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 6);

    let mut edited = plan(customer_id, &yerba, 10);
    edited.id = Some(saved.id);
    let order = gw.save_order(&edited).await.unwrap();
    assert_eq!(order.lines[0].quantity, 10);
    assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_saves_cannot_overdraw(pool: PgPool) {
    let gw = PgGateway::new(pool);
    let (customer_id, yerba) = seed(&gw, 3).await;
    let order = plan(customer_id, &yerba, 3);

    let (a, b) = tokio::join!(gw.save_order(&order), gw.save_order(&order));
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 0);
}
