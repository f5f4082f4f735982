use crate::board::Board;
use crate::messages::{Message, MessageResolver};
use crate::models::Action;
use crate::parsing::{BlockParser, ParserError};

/// One conversation's worth of state: parser, message list and board.
///
/// Every input is processed to completion, in arrival order, before the next
/// is accepted. Sessions share nothing, so independent sessions can live on
/// different threads.
pub struct Session {
    parser: BlockParser,
    messages: MessageResolver,
    board: Board,
    actions: Vec<Action>,
}

impl Session {
    pub fn new(parser: BlockParser, messages: MessageResolver) -> Self {
        Self {
            parser,
            messages,
            board: Board::new(),
            actions: Vec::new(),
        }
    }

    /// Feed one raw chunk of model output.
    pub fn push_chunk(&mut self, chunk: &str) -> Result<(), ParserError> {
        self.push_action(Action::text(chunk))
    }

    /// Feed one upstream action; text is parsed, anything else passes through.
    pub fn push_action(&mut self, action: Action) -> Result<(), ParserError> {
        let Self {
            parser,
            messages,
            board,
            actions,
        } = self;
        parser.handle(action, &mut |emitted| {
            Self::dispatch(messages, board, actions, emitted)
        })
    }

    pub fn push_user(&mut self, content: impl Into<String>, images: Vec<String>) {
        self.messages.push_user(content, images);
    }

    /// End of the model's turn: flush the parser and finish assistant output.
    pub fn finish(&mut self) -> Result<(), ParserError> {
        let Self {
            parser,
            messages,
            board,
            actions,
        } = self;
        let result = parser.finish(&mut |emitted| {
            Self::dispatch(messages, board, actions, emitted)
        });
        messages.finish_assistant();
        result
    }

    /// Every action emitted so far, in order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.messages()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn parser(&self) -> &BlockParser {
        &self.parser
    }

    fn dispatch(
        messages: &mut MessageResolver,
        board: &mut Board,
        actions: &mut Vec<Action>,
        action: Action,
    ) {
        messages.apply(&action);
        board.apply(&action);
        actions.push(action);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(BlockParser::default(), MessageResolver::new())
    }
}
