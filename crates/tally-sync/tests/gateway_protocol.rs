//! TallyProtocolClient against a scripted TCP gateway.

mod common;

use common::{
    start_gateway, Answer, GatewayScript, AUTH_DENIED, AUTH_OK, INDICATION, SET_OK,
};
use tally_core::{GatewaySessions, LampState, SessionId, TallyColor, UnitId};
use tally_sync::{BridgeError, CommandOutcome, TallyCommand, TallyCommandSender, TallyProtocolClient};

fn red_on_for(session: &str) -> TallyCommand {
    TallyCommand::for_session(SessionId::new(session), TallyColor::Red, LampState::On)
}

#[tokio::test]
async fn acknowledged_command_is_confirmed() {
    let gateway = start_gateway(GatewayScript::ACKNOWLEDGING).await;
    let client = TallyProtocolClient::new(gateway.config());

    let outcome = client.send(&red_on_for("PH3XQD")).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Confirmed);

    let received = gateway.received();
    assert_eq!(received.len(), 1);
    assert!(received[0].contains("<sessionid>PH3XQD</sessionid>"));
    assert!(received[0].contains(r#"<function id="8215">"#));
    assert!(received[0].contains("<Value>1</Value>"));
}

#[tokio::test]
async fn rejected_authentication_aborts_before_value_change() {
    let gateway = start_gateway(GatewayScript {
        auth: Answer::Reply(AUTH_DENIED),
        set: Answer::Reply(SET_OK),
    })
    .await;
    let client = TallyProtocolClient::new(gateway.config());

    let err = client.send(&red_on_for("PH3XQD")).await.unwrap_err();
    assert!(matches!(err, BridgeError::AuthenticationRejected(_)));
    assert!(gateway.received().is_empty());
}

#[tokio::test]
async fn silent_gateway_is_optimistic_success() {
    let gateway = start_gateway(GatewayScript {
        auth: Answer::Silent,
        set: Answer::Silent,
    })
    .await;
    let client = TallyProtocolClient::new(gateway.config());

    let outcome = client.send(&red_on_for("PH3XQD")).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Assumed);
    assert_eq!(gateway.received().len(), 1);
}

#[tokio::test]
async fn late_authentication_indication_counts_as_success() {
    let gateway = start_gateway(GatewayScript {
        auth: Answer::Silent,
        set: Answer::Reply(INDICATION),
    })
    .await;
    let client = TallyProtocolClient::new(gateway.config());

    let outcome = client.send(&red_on_for("PH3XQD")).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Confirmed);
}

#[tokio::test]
async fn unrecognized_reply_fails_the_command() {
    let gateway = start_gateway(GatewayScript {
        auth: Answer::Reply(AUTH_OK),
        set: Answer::Reply(r#"<error code="3"/>"#),
    })
    .await;
    let client = TallyProtocolClient::new(gateway.config());

    let err = client.send(&red_on_for("PH3XQD")).await.unwrap_err();
    assert!(matches!(err, BridgeError::CommandRejected(ref text) if text.contains("error")));
}

#[tokio::test]
async fn closed_connection_after_value_change_fails() {
    let gateway = start_gateway(GatewayScript {
        auth: Answer::Reply(AUTH_OK),
        set: Answer::Close,
    })
    .await;
    let client = TallyProtocolClient::new(gateway.config());

    assert!(client.send(&red_on_for("PH3XQD")).await.is_err());
}

#[tokio::test]
async fn unknown_unit_is_sent_with_empty_session() {
    let gateway = start_gateway(GatewayScript::ACKNOWLEDGING).await;
    let client = TallyProtocolClient::new(gateway.config());

    let command = TallyCommand::for_unit(
        &UnitId::new("XCU-99").unwrap(),
        TallyColor::Green,
        LampState::Off,
        &GatewaySessions::new(),
    );
    assert!(command.session.is_unresolved());

    client.send(&command).await.unwrap();

    let received = gateway.received();
    assert!(received[0].contains("<sessionid></sessionid>"));
    assert!(received[0].contains(r#"<function id="8216">"#));
    assert!(received[0].contains("<Value>0</Value>"));
}

#[tokio::test]
async fn every_command_uses_its_own_connection() {
    let gateway = start_gateway(GatewayScript::ACKNOWLEDGING).await;
    let client = TallyProtocolClient::new(gateway.config());

    client.send(&red_on_for("A")).await.unwrap();
    client.send(&red_on_for("B")).await.unwrap();
    client.send(&red_on_for("C")).await.unwrap();

    assert_eq!(*gateway.connections.lock().unwrap(), 3);
    assert_eq!(gateway.received().len(), 3);
}
