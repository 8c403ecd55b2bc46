//! Author resolution tests against the in-memory store

use std::sync::Arc;

use researchhub_authors::{
    config::SearchCacheConfig,
    error::AppError,
    models::{
        AuthorCandidate, AuthorIdentity, AuthorSearchHit, ConflictKind, CreateAuthorOutcome,
        FuzzyPolicy, MatchRule, NewAuthor, PublicationAuthorInput, PublicationAuthorLink,
        Researcher, Resolution, ResolveOutcome,
    },
    repository::MemoryAuthorStore,
    services::Services,
};

fn services(store: &MemoryAuthorStore) -> Services {
    Services::new(Arc::new(store.clone()), &SearchCacheConfig::default())
}

/// Resolve a candidate that is expected to end in a concrete author row
async fn resolve(
    services: &Services,
    candidate: &AuthorCandidate,
    policy: FuzzyPolicy,
) -> Result<Resolution, AppError> {
    match services.authors.resolve(candidate, policy).await? {
        ResolveOutcome::Resolved(resolution) => Ok(resolution),
        other => panic!("expected a resolved author, got {:?}", other),
    }
}

fn researcher(id: i32, name: &str, email: &str, orcid: Option<&str>) -> Researcher {
    Researcher {
        id,
        user_id: 100 + id,
        name: name.to_string(),
        email: email.to_string(),
        affiliation: Some("University of Lagos".to_string()),
        orcid: orcid.map(str::to_string),
        avatar_url: None,
        title: Some("Dr.".to_string()),
        bio: None,
        featured: false,
    }
}

fn new_author(name: &str, email: Option<&str>, affiliation: Option<&str>, orcid: Option<&str>) -> NewAuthor {
    NewAuthor {
        name: name.to_string(),
        email: email.map(str::to_string),
        affiliation: affiliation.map(str::to_string),
        orcid: orcid.map(str::to_string),
        researcher_id: None,
    }
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_resolve_creates_then_reuses_by_email() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let candidate = AuthorCandidate::new("Amara Obi").with_email("amara@uni.edu");

    let first = resolve(&services, &candidate, FuzzyPolicy::Advise).await.unwrap();
    assert!(first.created);
    assert_eq!(first.matched_by, MatchRule::NewAuthor);
    assert_eq!(first.author.name, "Amara Obi");
    assert_eq!(first.author.email.as_deref(), Some("amara@uni.edu"));
    assert_eq!(first.author.orcid, None);
    assert_eq!(first.author.researcher_id, None);

    let second = resolve(&services, &candidate, FuzzyPolicy::Advise).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.matched_by, MatchRule::Email);
    assert_eq!(second.author_id(), first.author_id());
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_resolve_email_is_case_insensitive() {
    let store = MemoryAuthorStore::new();
    let existing = store.seed_author(new_author("Amara Obi", Some("amara@uni.edu"), None, None));
    let services = services(&store);

    let resolution = resolve(
            &services,
            &AuthorCandidate::new("A. Obi").with_email("  AMARA@Uni.edu "),
            FuzzyPolicy::Advise,
        )
        .await
        .unwrap();

    assert_eq!(resolution.author_id(), existing.id);
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_orcid_outranks_email() {
    let store = MemoryAuthorStore::new();
    let by_orcid = store.seed_author(new_author(
        "Kwame Mensah",
        Some("kwame@old.edu"),
        None,
        Some("0000-0002-1825-0097"),
    ));
    let by_email = store.seed_author(new_author("K. Mensah", Some("kmensah@new.edu"), None, None));
    let services = services(&store);

    let candidate = AuthorCandidate::new("Kwame Mensah")
        .with_email("kmensah@new.edu")
        .with_orcid("https://orcid.org/0000-0002-1825-0097");
    let resolution = resolve(&services, &candidate, FuzzyPolicy::Advise).await.unwrap();

    assert_eq!(resolution.author_id(), by_orcid.id);
    assert_ne!(resolution.author_id(), by_email.id);
    assert_eq!(resolution.matched_by, MatchRule::Orcid);
}

#[tokio::test]
async fn test_explicit_author_id_wins() {
    let store = MemoryAuthorStore::new();
    let target = store.seed_author(new_author("Li Wei", None, None, None));
    store.seed_author(new_author("Other", Some("other@uni.edu"), None, None));
    let services = services(&store);

    let candidate = AuthorCandidate::new("Li Wei")
        .with_email("other@uni.edu")
        .with_author(target.id);
    let resolution = resolve(&services, &candidate, FuzzyPolicy::Advise).await.unwrap();

    assert_eq!(resolution.author_id(), target.id);
    assert_eq!(resolution.matched_by, MatchRule::AuthorId);
}

#[tokio::test]
async fn test_missing_references_are_not_found() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);

    let err = resolve(&services, &AuthorCandidate::new("Ghost").with_author(42), FuzzyPolicy::Advise)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = resolve(&services, &AuthorCandidate::new("Ghost").with_researcher(7), FuzzyPolicy::Advise)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(store.authors().is_empty());
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);

    let err = resolve(&services, &AuthorCandidate::new("  ").with_email("x@uni.edu"), FuzzyPolicy::Advise)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(store.authors().is_empty());
}

#[tokio::test]
async fn test_researcher_id_creates_linked_author_once() {
    let store = MemoryAuthorStore::new();
    store.add_researcher(researcher(1, "Ngozi Eze", "Ngozi@Unilag.edu", Some("0000-0001-5109-3700")));
    let services = services(&store);
    let candidate = AuthorCandidate::new("Ngozi Eze").with_researcher(1);

    let first = resolve(&services, &candidate, FuzzyPolicy::Advise).await.unwrap();
    assert!(first.created);
    assert_eq!(first.author.researcher_id, Some(1));
    assert_eq!(first.author.email.as_deref(), Some("ngozi@unilag.edu"));
    assert_eq!(first.author.orcid.as_deref(), Some("0000-0001-5109-3700"));
    assert!(matches!(first.identity(), AuthorIdentity::Researcher(ref r) if r.id == 1));

    let second = resolve(&services, &candidate, FuzzyPolicy::Advise).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.author_id(), first.author_id());
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_concurrent_researcher_link_is_idempotent() {
    let store = MemoryAuthorStore::new();
    store.add_researcher(researcher(3, "Tunde Bakare", "tunde@unilag.edu", None));
    let services = services(&store);
    let candidate = AuthorCandidate::new("Tunde Bakare").with_researcher(3);

    let (a, b) = tokio::join!(
        resolve(&services, &candidate, FuzzyPolicy::Advise),
        resolve(&services, &candidate, FuzzyPolicy::Advise),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.author_id(), b.author_id());
    let linked: Vec<_> = store
        .authors()
        .into_iter()
        .filter(|author| author.researcher_id == Some(3))
        .collect();
    assert_eq!(linked.len(), 1);
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_concurrent_same_orcid_creates_one_row() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let first = AuthorCandidate::new("Ana Souza")
        .with_email("ana@usp.br")
        .with_orcid("0000-0002-1694-233X");
    let second = AuthorCandidate::new("Ana P. Souza")
        .with_email("asouza@gmail.com")
        .with_orcid("0000-0002-1694-233x");

    let (a, b) = tokio::join!(
        resolve(&services, &first, FuzzyPolicy::Advise),
        resolve(&services, &second, FuzzyPolicy::Advise),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.author_id(), b.author_id());
    let with_orcid = store
        .authors()
        .into_iter()
        .filter(|author| author.orcid.as_deref() == Some("0000-0002-1694-233X"))
        .count();
    assert_eq!(with_orcid, 1);
}

#[tokio::test]
async fn test_lost_insert_race_returns_existing_row() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    store.race_next_insert(new_author("Amara Obi", Some("amara@uni.edu"), None, None));

    let resolution = resolve(
            &services,
            &AuthorCandidate::new("Amara Obi").with_email("amara@uni.edu"),
            FuzzyPolicy::Advise,
        )
        .await
        .unwrap();

    let authors = store.authors();
    assert_eq!(authors.len(), 1);
    assert_eq!(resolution.author_id(), authors[0].id);
    assert_eq!(resolution.matched_by, MatchRule::Email);
    assert!(!resolution.created);
}

#[tokio::test]
async fn test_researcher_match_by_orcid_links_researcher() {
    let store = MemoryAuthorStore::new();
    store.add_researcher(researcher(5, "Fatima Bello", "fatima@unilag.edu", Some("0000-0001-5109-3700")));
    let services = services(&store);

    let resolution = resolve(
            &services,
            &AuthorCandidate::new("F. Bello").with_orcid("0000-0001-5109-3700"),
            FuzzyPolicy::Advise,
        )
        .await
        .unwrap();

    assert_eq!(resolution.matched_by, MatchRule::Orcid);
    assert_eq!(resolution.author.researcher_id, Some(5));
    assert_eq!(resolution.author.name, "Fatima Bello");
    assert!(resolution.researcher.is_some());
}

#[tokio::test]
async fn test_researcher_link_promotes_matching_standalone_author() {
    let store = MemoryAuthorStore::new();
    let standalone = store.seed_author(new_author("Chidi Okafor", Some("chidi@unilag.edu"), None, None));
    store.add_researcher(researcher(9, "Chidi Okafor", "chidi@unilag.edu", None));
    let services = services(&store);

    let resolution = resolve(&services, &AuthorCandidate::new("Chidi Okafor").with_researcher(9), FuzzyPolicy::Advise)
        .await
        .unwrap();

    assert_eq!(resolution.author_id(), standalone.id);
    assert_eq!(resolution.author.researcher_id, Some(9));
    assert_eq!(store.authors().len(), 1);
    assert_eq!(store.authors()[0].researcher_id, Some(9));
}

#[tokio::test]
async fn test_researcher_never_takes_another_researchers_author() {
    let store = MemoryAuthorStore::new();
    store.add_researcher(researcher(1, "Shared Lab", "lab@uni.edu", None));
    store.add_researcher(researcher(2, "Second Member", "LAB@uni.edu", None));
    let services = services(&store);

    let first = resolve(&services, &AuthorCandidate::new("Shared Lab").with_researcher(1), FuzzyPolicy::Advise)
        .await
        .unwrap();
    assert_eq!(first.author.researcher_id, Some(1));

    let err = services
        .authors
        .resolve(&AuthorCandidate::new("Second Member").with_researcher(2), FuzzyPolicy::Advise)
        .await
        .unwrap_err();
    match err {
        AppError::Validation(ref msg) => {
            assert!(msg.contains("id 2"));
            assert!(msg.contains("researcher id 1"));
        }
        ref other => panic!("expected validation error, got {:?}", other),
    }

    let authors = store.authors();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].researcher_id, Some(1));
}

#[tokio::test]
async fn test_inactive_researcher_is_ignored() {
    let store = MemoryAuthorStore::new();
    store.add_researcher(researcher(6, "Former Member", "former@unilag.edu", Some("0000-0001-5109-3700")));
    store.deactivate_researcher(6);
    let services = services(&store);

    let err = resolve(&services, &AuthorCandidate::new("Former Member").with_researcher(6), FuzzyPolicy::Advise)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let outcome = services
        .authors
        .create_author(
            &AuthorCandidate::new("Former Member")
                .with_email("former@unilag.edu")
                .with_orcid("0000-0001-5109-3700"),
        )
        .await
        .unwrap();
    assert!(outcome.is_created());

    let hits = services.authors.search_candidates("former", 10).await.unwrap();
    assert!(hits.iter().all(|h| matches!(h, AuthorSearchHit::Author(_))));
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_fuzzy_match_policy() {
    let store = MemoryAuthorStore::new();
    let john = store.seed_author(new_author("John Smith", None, Some("MIT"), None));
    let services = services(&store);
    let candidate = AuthorCandidate::new("J. Smith").with_affiliation("mit");

    let accepted = resolve(&services, &candidate, FuzzyPolicy::Accept).await.unwrap();
    assert_eq!(accepted.author_id(), john.id);
    assert_eq!(accepted.matched_by, MatchRule::NameAffiliation);
    assert_eq!(store.authors().len(), 1);

    let advised = services.authors.resolve(&candidate, FuzzyPolicy::Advise).await.unwrap();
    match advised {
        ResolveOutcome::PotentialDuplicate { ref suggestion, ref explanation } => {
            assert_eq!(suggestion.id, john.id);
            assert!(explanation.contains("John Smith"));
        }
        ref other => panic!("expected potential duplicate, got {:?}", other),
    }
    assert!(advised.resolution().is_none());
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_default_policy_never_creates_near_duplicate() {
    let store = MemoryAuthorStore::new();
    store.seed_author(new_author("John Smith", None, Some("MIT"), None));
    let services = services(&store);
    let candidate = AuthorCandidate::new("J. Smith").with_affiliation("MIT");

    for _ in 0..2 {
        let outcome = services
            .authors
            .resolve(&candidate, FuzzyPolicy::default())
            .await
            .unwrap();
        assert!(!outcome.is_resolved());
    }
    assert_eq!(store.authors().len(), 1);

    // the explicit creation flow is how a human overrides the suggestion
    let outcome = services
        .authors
        .create_author(&AuthorCandidate::new("Jane Smith").with_affiliation("Stanford"))
        .await
        .unwrap();
    assert!(outcome.is_created());
}

// ---------------------------------------------------------------------------
// create_author
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_author_refuses_duplicate_email() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let candidate = AuthorCandidate::new("Amara Obi").with_email("amara@uni.edu");

    let created = services.authors.create_author(&candidate).await.unwrap();
    assert!(created.is_created());

    let again = services.authors.create_author(&candidate).await.unwrap();
    match again {
        CreateAuthorOutcome::DuplicateConflict { kind, ref existing } => {
            assert_eq!(kind, ConflictKind::Email);
            assert_eq!(existing.name, "Amara Obi");
        }
        ref other => panic!("expected duplicate conflict, got {:?}", other),
    }
    assert!(again.message().contains("already exists"));
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_create_author_refuses_duplicate_orcid() {
    let store = MemoryAuthorStore::new();
    store.seed_author(new_author("Ana Souza", None, None, Some("0000-0002-1694-233X")));
    let services = services(&store);

    let outcome = services
        .authors
        .create_author(&AuthorCandidate::new("Ana Souza").with_orcid("0000-0002-1694-233X"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CreateAuthorOutcome::DuplicateConflict { kind: ConflictKind::Orcid, .. }
    ));
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_create_author_refuses_researcher_identity() {
    let store = MemoryAuthorStore::new();
    store.add_researcher(researcher(2, "Musa Danjuma", "musa@unilag.edu", Some("0000-0001-5109-3700")));
    let services = services(&store);

    let outcome = services
        .authors
        .create_author(&AuthorCandidate::new("Musa Danjuma").with_orcid("0000-0001-5109-3700"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        CreateAuthorOutcome::AlreadyResearcher { kind: ConflictKind::Orcid, ref researcher } if researcher.id == 2
    ));

    let outcome = services
        .authors
        .create_author(&AuthorCandidate::new("Musa D.").with_email("MUSA@unilag.edu"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        CreateAuthorOutcome::AlreadyResearcher { kind: ConflictKind::Email, .. }
    ));
    assert!(store.authors().is_empty());
}

#[tokio::test]
async fn test_create_author_fuzzy_match_is_advisory() {
    let store = MemoryAuthorStore::new();
    let john = store.seed_author(new_author("John Smith", None, Some("MIT"), None));
    let services = services(&store);

    let outcome = services
        .authors
        .create_author(&AuthorCandidate::new("J. Smith").with_affiliation("MIT"))
        .await
        .unwrap();

    match outcome {
        CreateAuthorOutcome::PotentialDuplicate { ref suggestion } => assert_eq!(suggestion.id, john.id),
        ref other => panic!("expected potential duplicate, got {:?}", other),
    }
    assert!(outcome.message().starts_with("Did you mean"));
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_concurrent_create_author_yields_one_row() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let candidate = AuthorCandidate::new("Amara Obi").with_email("amara@uni.edu");

    let (a, b) = tokio::join!(
        services.authors.create_author(&candidate),
        services.authors.create_author(&candidate),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(outcomes.iter().filter(|o| o.is_created()).count(), 1);
    assert!(outcomes.iter().any(|o| matches!(
        o,
        CreateAuthorOutcome::DuplicateConflict { kind: ConflictKind::Email, .. }
    )));
    assert_eq!(store.authors().len(), 1);
}

// ---------------------------------------------------------------------------
// search_candidates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_search_splits_limit_and_counts_publications() {
    let store = MemoryAuthorStore::new();
    for id in 1..=6 {
        store.add_researcher(researcher(id, &format!("Obi Researcher {}", id), &format!("r{}@unilag.edu", id), None));
    }
    let seeded: Vec<_> = (1..=6)
        .map(|n| store.seed_author(new_author(&format!("Obi Author {}", n), None, None, None)))
        .collect();
    let first_author = &seeded[0];
    store.seed_link(PublicationAuthorLink {
        publication_id: 1,
        author_id: first_author.id,
        position: 0,
        contribution: None,
        is_corresponding: true,
    });
    let services = services(&store);

    let hits = services.authors.search_candidates("obi", 10).await.unwrap();

    let researchers = hits.iter().filter(|h| matches!(h, AuthorSearchHit::Researcher(_))).count();
    let authors: Vec<_> = hits
        .iter()
        .filter_map(|h| match h {
            AuthorSearchHit::Author(a) => Some(a),
            _ => None,
        })
        .collect();
    assert_eq!(researchers, 5);
    assert_eq!(authors.len(), 5);
    assert_eq!(authors[0].id, first_author.id);
    assert_eq!(authors[0].publication_count, 1);
    assert_eq!(authors[1].publication_count, 0);
}

#[tokio::test]
async fn test_search_edge_limits() {
    let store = MemoryAuthorStore::new();
    store.seed_author(new_author("Obi", None, None, None));
    let services = services(&store);

    assert!(services.authors.search_candidates("obi", 1).await.unwrap().is_empty());
    assert!(services.authors.search_candidates("   ", 10).await.unwrap().is_empty());
    assert_eq!(services.authors.search_candidates("OBI", 3).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_cache_invalidated_by_creation() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);

    assert!(services.authors.search_candidates("zed", 10).await.unwrap().is_empty());

    // written behind the service's back: the cached answer is still served
    store.seed_author(new_author("Zed Alpha", None, None, None));
    assert!(services.authors.search_candidates("zed", 10).await.unwrap().is_empty());

    services
        .authors
        .create_author(&AuthorCandidate::new("Zed Beta").with_email("zed@uni.edu"))
        .await
        .unwrap();
    assert_eq!(services.authors.search_candidates("zed", 10).await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// resolve_for_publication / set_authors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_batch_rejects_duplicate_order_before_writing() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let inputs = vec![
        PublicationAuthorInput::new(AuthorCandidate::new("A One").with_email("a1@uni.edu"), 0),
        PublicationAuthorInput::new(AuthorCandidate::new("A Two").with_email("a2@uni.edu"), 0),
        PublicationAuthorInput::new(AuthorCandidate::new("A Three").with_email("a3@uni.edu"), 1),
    ];

    let err = services.authors.resolve_for_publication(&inputs).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(store.authors().is_empty());
}

#[tokio::test]
async fn test_batch_rejects_gaps_in_order() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let inputs = vec![
        PublicationAuthorInput::new(AuthorCandidate::new("A One"), 0),
        PublicationAuthorInput::new(AuthorCandidate::new("A Two"), 2),
    ];

    let err = services.authors.resolve_for_publication(&inputs).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_batch_same_person_twice_rolls_back() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let inputs = vec![
        PublicationAuthorInput::new(AuthorCandidate::new("Ada Lovelace").with_email("ada@uni.edu"), 0),
        PublicationAuthorInput::new(AuthorCandidate::new("A. Lovelace").with_email("ADA@uni.edu"), 1),
    ];

    let err = services.authors.resolve_for_publication(&inputs).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(store.authors().is_empty());
}

#[tokio::test]
async fn test_batch_failure_leaves_no_authors() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);
    let inputs = vec![
        PublicationAuthorInput::new(AuthorCandidate::new("New Person").with_email("new@uni.edu"), 0),
        PublicationAuthorInput::new(AuthorCandidate::new("Missing").with_author(999), 1),
    ];

    let err = services.authors.resolve_for_publication(&inputs).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(store.authors().is_empty());
}

#[tokio::test]
async fn test_batch_resolves_mixed_candidates() {
    let store = MemoryAuthorStore::new();
    store.add_researcher(researcher(4, "Bola Ade", "bola@unilag.edu", None));
    let john = store.seed_author(new_author("John Smith", None, Some("MIT"), None));
    let services = services(&store);

    let mut corresponding = PublicationAuthorInput::new(AuthorCandidate::new("Bola Ade").with_researcher(4), 0);
    corresponding.is_corresponding = true;
    corresponding.contribution = Some("  Writing ".to_string());
    let inputs = vec![
        corresponding,
        PublicationAuthorInput::new(AuthorCandidate::new("J. Smith").with_affiliation("MIT"), 1),
        PublicationAuthorInput::new(AuthorCandidate::new("Amara Obi").with_email("amara@uni.edu"), 2),
    ];

    let resolved = services.authors.resolve_for_publication(&inputs).await.unwrap();

    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[0].matched_by, MatchRule::ResearcherId);
    assert!(resolved[0].is_corresponding);
    assert_eq!(resolved[0].contribution.as_deref(), Some("Writing"));
    assert_eq!(resolved[1].author_id, john.id);
    assert_eq!(resolved[1].matched_by, MatchRule::NameAffiliation);
    assert_eq!(resolved[2].matched_by, MatchRule::NewAuthor);
    assert_eq!(store.authors().len(), 3);
}

#[tokio::test]
async fn test_set_authors_replaces_links() {
    let store = MemoryAuthorStore::new();
    store.add_publication(1);
    let services = services(&store);

    let links = services
        .publications
        .set_authors(
            1,
            &[
                PublicationAuthorInput::new(AuthorCandidate::new("Amara Obi").with_email("amara@uni.edu"), 0),
                PublicationAuthorInput::new(AuthorCandidate::new("Li Wei").with_email("li@uni.edu"), 1),
            ],
        )
        .await
        .unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(store.publication_links(1), links);

    let links = services
        .publications
        .set_authors(
            1,
            &[PublicationAuthorInput::new(AuthorCandidate::new("Li Wei").with_email("li@uni.edu"), 0)],
        )
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].position, 0);
    assert_eq!(store.publication_links(1).len(), 1);
    assert_eq!(store.authors().len(), 2);

    let hits = services.authors.search_candidates("li wei", 10).await.unwrap();
    assert!(matches!(hits.as_slice(), [AuthorSearchHit::Author(a)] if a.publication_count == 1));
}

#[tokio::test]
async fn test_set_authors_failure_keeps_previous_links() {
    let store = MemoryAuthorStore::new();
    store.add_publication(1);
    let services = services(&store);

    let original = services
        .publications
        .set_authors(
            1,
            &[PublicationAuthorInput::new(AuthorCandidate::new("Amara Obi").with_email("amara@uni.edu"), 0)],
        )
        .await
        .unwrap();

    let err = services
        .publications
        .set_authors(
            1,
            &[
                PublicationAuthorInput::new(AuthorCandidate::new("Someone New").with_email("new@uni.edu"), 0),
                PublicationAuthorInput::new(AuthorCandidate::new("Missing").with_researcher(77), 1),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(store.publication_links(1), original);
    assert_eq!(store.authors().len(), 1);
}

#[tokio::test]
async fn test_set_authors_unknown_publication() {
    let store = MemoryAuthorStore::new();
    let services = services(&store);

    let err = services
        .publications
        .set_authors(
            404,
            &[PublicationAuthorInput::new(AuthorCandidate::new("Amara Obi"), 0)],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(store.authors().is_empty());
}
