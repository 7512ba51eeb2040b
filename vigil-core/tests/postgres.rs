#![cfg(feature = "database")]

use sqlx::PgPool;
use vigil_core::database::{
    AccountDirectory, PostgresAccountDirectory, PostgresVerdictRepository, VerdictRepository,
};
use vigil_core::{AccountId, FlagSet, RuleKey, SuspicionVerdict, VerdictStatus};

async fn seed_accounts(pool: &PgPool, count: i64) {
    for id in 1..=count {
        sqlx::query(
            "INSERT INTO accounts (id, username, email, display_name, first_name, last_name) \
             VALUES ($1, $2, $3, 'Jane Doe', 'Jane', 'Doe')",
        )
        .bind(id)
        .bind(format!("user{id}"))
        .bind(format!("user{id}@example.com"))
        .execute(pool)
        .await
        .expect("seed account");
    }
}

#[sqlx::test(migrator = "vigil_core::MIGRATOR")]
#[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
async fn account_pages_follow_id_order(pool: PgPool) {
    seed_accounts(&pool, 7).await;
    let directory = PostgresAccountDirectory::new(pool);

    let page = directory.list_accounts_page(AccountId(2), 3).await.unwrap();
    let ids: Vec<i64> = page.iter().map(|a| a.id.get()).collect();
    assert_eq!(ids, vec![3, 4, 5]);
    assert_eq!(page[0].first_name, "Jane");

    assert!(directory.delete_account(AccountId(3)).await.unwrap());
    assert!(directory.get_account(AccountId(3)).await.unwrap().is_none());
}

#[sqlx::test(migrator = "vigil_core::MIGRATOR")]
#[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
async fn verdicts_round_trip_through_postgres(pool: PgPool) {
    let repo = PostgresVerdictRepository::new(pool);
    let flags = FlagSet::new([RuleKey::NUMBERS, RuleKey::NO_VOWELS]).unwrap();

    repo.set_verdict(AccountId(1), &SuspicionVerdict::Flagged(flags.clone()))
        .await
        .unwrap();
    repo.set_verdict(AccountId(2), &SuspicionVerdict::Cleared)
        .await
        .unwrap();
    repo.set_verdict(AccountId(3), &SuspicionVerdict::Flagged(FlagSet::admin()))
        .await
        .unwrap();

    assert_eq!(
        repo.get_verdict(AccountId(1)).await.unwrap(),
        SuspicionVerdict::Flagged(flags)
    );
    assert_eq!(
        repo.get_verdict(AccountId(9)).await.unwrap(),
        SuspicionVerdict::NotChecked
    );
    assert_eq!(repo.count_flagged().await.unwrap(), 2);

    let flagged = repo
        .list_by_status(VerdictStatus::Flagged, AccountId(1), 10)
        .await
        .unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].account_id, AccountId(3));

    repo.set_verdict(AccountId(1), &SuspicionVerdict::NotChecked)
        .await
        .unwrap();
    assert_eq!(repo.count_flagged().await.unwrap(), 1);
    assert_eq!(repo.purge_all().await.unwrap(), 2);
}
